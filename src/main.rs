//! Compose Deploy Hook
//!
//! Usage:
//! - Normal mode: `compose-deploy-hook`
//! - With custom port: `compose-deploy-hook --port 9000`

use compose_deploy_hook::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Compose Deploy Hook - git sync + docker compose redeploy over HTTP");
    println!();
    println!("USAGE:");
    println!("    compose-deploy-hook [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port (default: $PORT or 8000)");
    println!("    -h, --help       Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    DEPLOY_WORKDIR   Mounted compose project (default: /app/parent)");
    println!("    DEPLOY_SERVICES  Comma-separated services (default: frontend,app)");
    println!("    GIT_USERNAME     Username for the HTTPS remote fallback");
    println!("    GIT_TOKEN        Token for the HTTPS remote fallback");
}

fn main() {
    let config = parse_args();

    // .env 可选
    dotenvy::dotenv().ok();
    compose_deploy_hook::init_tracing();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let result = rt.block_on(compose_deploy_hook::run_with_config(config));

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
