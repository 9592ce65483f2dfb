use serde_json::json;

use callcart_core::config::LoadOptions;
use callcart_db::{migrations, DemoCatalog, Repositories, VerificationResult};

use crate::commands::{
    connect, load_config, runtime, CommandResult, StepError, EXIT_EXECUTION, EXIT_VERIFICATION,
};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_EXECUTION))?;

        let repositories = Repositories::sql(pool.clone());
        let seeded = DemoCatalog::load(&repositories)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_EXECUTION))?;
        let verification = DemoCatalog::verify(&repositories)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_VERIFICATION))?;

        pool.close().await;
        if !verification.all_present {
            return Err(("seed_verification", verification_message(&verification), EXIT_VERIFICATION));
        }
        Ok::<_, StepError>(seeded)
    });

    match result {
        Ok(seeded) => CommandResult::success_with_details(
            "seed",
            format!(
                "demo catalog loaded for merchant {} ({} products)",
                seeded.merchant_id.as_str(),
                seeded.products_seeded
            ),
            Some(json!({
                "merchant_id": seeded.merchant_id.as_str(),
                "products": DemoCatalog::products()
                    .iter()
                    .map(|product| product.product_id.as_str().to_string())
                    .collect::<Vec<_>>(),
            })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_message(verification: &VerificationResult) -> String {
    let failed = verification.failed_checks();
    if failed.is_empty() {
        "some demo catalog records failed to load".to_string()
    } else {
        format!("demo catalog verification failed for checks: {}", failed.join(", "))
    }
}
