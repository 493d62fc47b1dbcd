use std::env;
use std::path::Path;

use pungi::util::{ExecRequest, ExecService};
use pungi::ConfigLayer;

/// Locate `program` on PATH and report its version line.
fn report_tool(label: &str, program: &str) -> bool {
    match which::which(program) {
        Ok(path) => {
            let version = ExecService::default()
                .run(ExecRequest::new(&path).arg("--version"))
                .ok()
                .filter(|o| o.status.success())
                .and_then(|o| o.output.lines().next().map(|l| l.trim().to_string()))
                .unwrap_or_else(|| "(version query failed)".to_string());
            eprintln!("  {label:<8} {} ({version})", path.display());
            true
        }
        Err(e) => {
            eprintln!("  {label:<8} not found ({e})");
            false
        }
    }
}

/// Returns true when every required tool was found.
pub fn run_doctor(config_file: Option<&Path>) -> bool {
    eprintln!("pungi doctor");
    eprintln!();
    eprintln!(
        "  version: v{} (built {}, {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("PUNGI_BUILD_DATE"),
        env!("PUNGI_BUILD_PROFILE"),
        env!("PUNGI_BUILD_RUSTC")
    );
    eprintln!(
        "  host:    {} / {} ({})",
        env::consts::OS,
        env::consts::ARCH,
        env!("PUNGI_BUILD_TARGET")
    );
    eprintln!();

    let layer = match pungi::load_base_layer(config_file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("  config:  {e}");
            ConfigLayer::default()
        }
    };
    let tool = layer
        .tool
        .clone()
        .unwrap_or_else(|| pungi::env_manager::DEFAULT_TOOL.to_string());

    let tool_ok = report_tool("tool:", &tool);
    let git_ok = report_tool("git:", "git");
    eprintln!();

    match pungi::config::config_file_path(config_file) {
        Some(p) => eprintln!("  config file:   {}", p.display()),
        None => eprintln!("  config file:   (none)"),
    }
    let staging_root = layer
        .staging_root
        .clone()
        .unwrap_or_else(pungi::config::default_staging_root);
    eprintln!("  staging root:  {}", staging_root.display());
    eprintln!(
        "  workdir mode:  {}",
        layer.workdir_mode.unwrap_or_default()
    );

    eprintln!();
    eprintln!("doctor: completed diagnostics.");
    tool_ok && git_ok
}
