use std::{env, fs, path::PathBuf};

use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `generate_types`. Do not edit it by hand.\n\n";
    let decls: Vec<String> = vec![
        utils::response::ErrorCode::decl(),
        db::models::creation::CreationType::decl(),
        db::models::creation::Creation::decl(),
        db::models::creation::CreationStats::decl(),
        services::services::creation::ImageUsage::decl(),
        server::routes::ai::GenerateArticleRequest::decl(),
        server::routes::ai::GenerateBlogTitleRequest::decl(),
        server::routes::ai::GenerateImageRequest::decl(),
        server::routes::ai::ContentResponse::decl(),
        server::routes::user::ToggleLikeRequest::decl(),
        server::routes::user::CreationsResponse::decl(),
        server::routes::health::HealthStatus::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|decl| {
            if decl.starts_with("export") {
                decl
            } else {
                format!("export {decl}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}{body}\n")
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    let generated = generate_types_content();

    if check_mode {
        match fs::read_to_string(&shared_path) {
            Ok(current) if current == generated => {
                println!("shared/types.ts is up to date.");
                std::process::exit(0);
            }
            _ => {
                eprintln!("shared/types.ts is out of date. Run `cargo run --bin generate_types`.");
                std::process::exit(1);
            }
        }
    }

    if let Some(parent) = shared_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Failed to create {}: {}", parent.display(), e);
            std::process::exit(1);
        }
    }
    if let Err(e) = fs::write(&shared_path, generated) {
        eprintln!("Failed to write {}: {}", shared_path.display(), e);
        std::process::exit(1);
    }
    println!("Wrote {}", shared_path.display());
}
