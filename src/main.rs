use anyhow::Context;
use log::info;
use timetable_engine::config::ServiceConfig;
use timetable_engine::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::from_env().context("loading service configuration")?;
    match &config.lab_solver_url {
        Some(url) => info!("Delegating labs to {}", url),
        None if config.in_process_lab_solver => info!("Solving labs in process with HiGHS"),
        None => info!("No lab solver; labs are placed by slot search"),
    }

    server::run_server(config).await.context("serving HTTP")?;
    Ok(())
}
