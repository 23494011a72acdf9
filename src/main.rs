//! pkgmirror binary entry point.

use pkgmirror::cli;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err}");
            let suggestions = err.recovery_suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  - {suggestion}");
                }
            }
            std::process::exit(1);
        }
    }
}
