use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use regperiod::cli::{parse_command, Command, USAGE};
use regperiod::config::{get_config, RegPeriodConfig};
use regperiod::errors::{RegPeriodError, RegPeriodResult};
use regperiod::fields::resolve_fields;
use regperiod::logging::init_logging;
use regperiod::store::{Database, RegistrationStore};
use regperiod::task::RegistrationPeriodTask;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("regperiod failed: {e}");
            eprintln!("regperiod failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> RegPeriodResult<()> {
    let config = get_config()?;
    init_logging(&config.logging)?;

    let db = Database::new().await?;
    info!(db_type = db.db_type(), "Connected to database");

    match command {
        Command::RunOnce => {
            let task = RegistrationPeriodTask::new(db, config.fields.clone());
            let report = task.execute().await?;
            println!("{}: {}", task.name(), report);
            Ok(())
        }
        Command::Check { user_id } => check_user(&*db, config, user_id).await,
        Command::Serve => serve(db, config).await,
    }
}

async fn check_user(
    db: &Database,
    config: &RegPeriodConfig,
    user_id: i64,
) -> RegPeriodResult<()> {
    let Some((suspended, deleted)) = db.get_suspended_and_deleted(user_id).await? else {
        println!("user {user_id}: not found");
        return Ok(());
    };

    let fields = resolve_fields(db, &config.fields).await?;
    let info = db
        .get_registration_info(user_id, fields.start, fields.end)
        .await?;

    println!("user {user_id}: suspended={suspended} deleted={deleted}");
    println!(
        "  {}: {}",
        config.fields.start_shortname,
        info.start.map_or("-".to_string(), |v| v.to_string())
    );
    println!(
        "  {}: {}",
        config.fields.end_shortname,
        info.end.map_or("-".to_string(), |v| v.to_string())
    );
    Ok(())
}

#[cfg(feature = "background-jobs")]
async fn serve(db: Arc<Database>, config: &RegPeriodConfig) -> RegPeriodResult<()> {
    use regperiod::jobs::JobScheduler;

    let mut scheduler = JobScheduler::new(db, config).await?;
    scheduler.start().await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| RegPeriodError::SchedulerError(format!("failed to wait for ctrl-c: {e}")))?;

    scheduler.shutdown().await
}

#[cfg(not(feature = "background-jobs"))]
async fn serve(_db: Arc<Database>, _config: &RegPeriodConfig) -> RegPeriodResult<()> {
    Err(RegPeriodError::ConfigError(
        "scheduler support not compiled in. Enable the 'background-jobs' feature.".to_string(),
    ))
}
