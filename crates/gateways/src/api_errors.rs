//! Vendor error classification.
//!
//! Maps an HTTP status plus response body from one of the upstream AI or
//! media providers onto a small set of categories, so callers can tell a
//! model that is still warming up apart from quota exhaustion, throttling,
//! overload and credential problems.

/// Category of a failed vendor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorErrorKind {
    /// The model is being loaded on the inference host; retrying shortly works.
    ModelLoading,
    QuotaExceeded,
    RateLimited,
    ServerOverloaded,
    AuthenticationFailed,
    /// The vendor rejected the request itself (bad prompt, safety filter...).
    InvalidRequest,
    Unknown,
}

impl VendorErrorKind {
    /// Whether the same request may succeed if resubmitted later.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            VendorErrorKind::ModelLoading
                | VendorErrorKind::RateLimited
                | VendorErrorKind::ServerOverloaded
        )
    }
}

/// Classify a vendor failure from its status code and body.
pub fn classify_vendor_error(status: u16, body: &str) -> VendorErrorKind {
    let lowered = body.to_lowercase();

    // === Hugging Face inference API ===
    if lowered.contains("currently loading")
        || lowered.contains("is loading")
        || (status == 503 && lowered.contains("estimated_time"))
    {
        return VendorErrorKind::ModelLoading;
    }

    // === Google AI / Gemini ===
    if lowered.contains("resource_exhausted") {
        return if lowered.contains("quota") {
            VendorErrorKind::QuotaExceeded
        } else {
            VendorErrorKind::RateLimited
        };
    }
    if lowered.contains("api_key_invalid") || lowered.contains("api key not valid") {
        return VendorErrorKind::AuthenticationFailed;
    }

    // === Cloudinary ===
    if lowered.contains("invalid signature") || lowered.contains("invalid api_key") {
        return VendorErrorKind::AuthenticationFailed;
    }

    // === Generic quota/credit exhaustion (fallback) ===
    if lowered.contains("quota exceeded")
        || lowered.contains("quota_exceeded")
        || lowered.contains("exceeded your current quota")
        || lowered.contains("insufficient credit")
        || lowered.contains("monthly usage limit")
        || (lowered.contains("billing") && lowered.contains("limit"))
    {
        return VendorErrorKind::QuotaExceeded;
    }

    // === Generic rate limiting (fallback) ===
    if status == 429
        || lowered.contains("rate limit")
        || lowered.contains("rate_limit")
        || lowered.contains("too many requests")
    {
        return VendorErrorKind::RateLimited;
    }

    // === Generic server overload (fallback) ===
    if status == 503
        || status == 502
        || lowered.contains("overloaded")
        || lowered.contains("server is busy")
        || lowered.contains("service unavailable")
    {
        return VendorErrorKind::ServerOverloaded;
    }

    // === Generic authentication errors (fallback) ===
    if status == 401
        || status == 403
        || lowered.contains("invalid api key")
        || lowered.contains("invalid_api_key")
        || lowered.contains("authentication failed")
        || lowered.contains("unauthorized")
    {
        return VendorErrorKind::AuthenticationFailed;
    }

    if status == 400 || status == 422 {
        return VendorErrorKind::InvalidRequest;
    }

    VendorErrorKind::Unknown
}
