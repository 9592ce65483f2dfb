use serde::Serialize;

use callcart_core::config::{AppConfig, LoadOptions};
use callcart_db::migrations::MIGRATOR;

use crate::commands::{connect, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn from_checks(checks: Vec<DoctorCheck>) -> Self {
        let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
        Self {
            overall_status: if all_pass { CheckStatus::Pass } else { CheckStatus::Fail },
            summary: if all_pass {
                "doctor: all readiness checks passed".to_string()
            } else {
                "doctor: one or more readiness checks failed".to_string()
            },
            checks,
        }
    }
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let passed = report.overall_status == CheckStatus::Pass;

    if json_output {
        let details = serde_json::to_value(&report).ok();
        return if passed {
            CommandResult::success_with_details("doctor", report.summary.clone(), details)
        } else {
            let failed = report
                .checks
                .iter()
                .filter(|check| check.status == CheckStatus::Fail)
                .map(|check| check.name)
                .collect::<Vec<_>>()
                .join(", ");
            CommandResult::failure("doctor", "readiness", format!("failed checks: {failed}"), 1)
        };
    }

    CommandResult { exit_code: if passed { 0 } else { 1 }, output: render_human(&report) }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            let skipped = |name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            };
            return DoctorReport::from_checks(vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                },
                skipped("database_connectivity"),
                skipped("schema_migrations"),
            ]);
        }
    };

    let mut checks = vec![DoctorCheck {
        name: "config_validation",
        status: CheckStatus::Pass,
        details: format!(
            "configuration loaded ({} environment, {} llm provider, webhook signatures {})",
            config.server.environment.as_str(),
            config.llm.provider.as_str(),
            if config.webhook.secret.is_some() { "enforced" } else { "not checked" }
        ),
    }];
    checks.extend(check_database(&config));
    DoctorReport::from_checks(checks)
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            }];
        }
    };

    runtime.block_on(async {
        let pool = match connect(config).await {
            Ok(pool) => pool,
            Err((_, message, _)) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {message}"),
                    },
                    DoctorCheck {
                        name: "schema_migrations",
                        status: CheckStatus::Skipped,
                        details: "skipped because the database is unreachable".to_string(),
                    },
                ];
            }
        };

        let connectivity = DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        };

        let known = MIGRATOR.iter().map(|migration| migration.version).max().unwrap_or_default();
        let applied = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&pool)
        .await;
        let migrations = match applied {
            Ok(Some(version)) if version >= known => DoctorCheck {
                name: "schema_migrations",
                status: CheckStatus::Pass,
                details: format!("schema at version {version}"),
            },
            Ok(applied) => DoctorCheck {
                name: "schema_migrations",
                status: CheckStatus::Fail,
                details: format!(
                    "schema at version {} but {known} is available; run `callcart migrate`",
                    applied.unwrap_or_default()
                ),
            },
            Err(_) => DoctorCheck {
                name: "schema_migrations",
                status: CheckStatus::Fail,
                details: "no migrations applied; run `callcart migrate`".to_string(),
            },
        };

        pool.close().await;
        vec![connectivity, migrations]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{render_human, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn any_failed_or_skipped_check_fails_the_report() {
        let report = DoctorReport::from_checks(vec![
            DoctorCheck { name: "config_validation", status: CheckStatus::Pass, details: "ok".into() },
            DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Skipped,
                details: "skipped".into(),
            },
        ]);

        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert_eq!(
            render_human(&report),
            "doctor: one or more readiness checks failed\n\
             - [ok] config_validation: ok\n\
             - [skip] database_connectivity: skipped"
        );
    }
}
