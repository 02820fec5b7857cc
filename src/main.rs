use invisible_cloak::api::cloak::InvisibleCloak;
use invisible_cloak::core::cloak::{CloakConfig, CloakError, HighGuiDisplay, OpenCvDevice};
use log::{error, info};
use std::process::ExitCode;

fn load_config() -> Result<CloakConfig, CloakError> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("⚙️ Loading config from {}", path);
            CloakConfig::load(path)
        }
        None => Ok(CloakConfig::default()),
    }
}

fn run() -> Result<i32, CloakError> {
    let config = load_config()?;
    let mut cloak = InvisibleCloak::create(OpenCvDevice, config)?;
    let report = cloak.run(HighGuiDisplay::new())?;
    info!(
        "✅ Done: {} frames, mean coverage {:.1}%",
        report.frames_composited,
        report.mean_coverage * 100.0
    );
    Ok(report.exit_code())
}

fn main() -> ExitCode {
    invisible_cloak::init_logging();

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {}", e);
            e.exit_code()
        }
    };
    ExitCode::from(code as u8)
}
