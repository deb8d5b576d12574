use serde::Serialize;

use crate::commands::CommandResult;
use appraisy_core::chain::ChainBuilder;
use appraisy_core::config::{AppConfig, LoadOptions};
use appraisy_core::directory::OrgSnapshot;
use appraisy_core::domain::appraisal::AppraisalId;
use appraisy_core::domain::employee::EmployeeId;
use appraisy_db::repositories::{EmployeeRepository, SqlEmployeeRepository};
use appraisy_db::{connect_with_settings, migrations};

#[derive(Debug, Serialize)]
struct ChainPreviewLevel {
    level: u32,
    approver_id: String,
    approver_role: String,
    can_rate: bool,
    is_final_approver: bool,
}

pub fn run(employee: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chain",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chain",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let employees = SqlEmployeeRepository::new(pool.clone())
            .list_all()
            .await
            .map_err(|error| ("employee_load", error.to_string(), 5u8))?;
        pool.close().await;

        let builder = ChainBuilder::new(OrgSnapshot::new(employees), config.chain_policy());
        let levels = builder
            .build(&AppraisalId("preview".to_string()), &EmployeeId(employee.to_string()))
            .map_err(|error| ("chain_build", error.to_string(), 6u8))?;

        Ok::<_, (&'static str, String, u8)>(
            levels
                .into_iter()
                .map(|level| ChainPreviewLevel {
                    level: level.level,
                    approver_id: level.approver_id.0,
                    approver_role: level.approver_role,
                    can_rate: level.can_rate,
                    is_final_approver: level.is_final_approver,
                })
                .collect::<Vec<_>>(),
        )
    });

    match result {
        Ok(levels) => match serde_json::to_string_pretty(&levels) {
            Ok(payload) => CommandResult { exit_code: 0, output: payload },
            Err(error) => {
                CommandResult::failure("chain", "serialization", error.to_string(), 7)
            }
        },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chain", error_class, message, exit_code)
        }
    }
}
