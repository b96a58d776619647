//! `studyplan doctor`: Diagnose configuration and provider health.

use studyplan_config::AppConfig;

use super::Services;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 studyplan Doctor: Diagnostics");
    println!("================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found");
    } else {
        println!("  ⚠️  No config file, using defaults (run `studyplan onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    println!("     Provider:  {}", config.default_provider);
    println!("     Model:     {}", config.default_model);
    println!("     Context:   {}", config.context.backend);

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key. Set GOOGLE_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    match Services::from_config(&config) {
        Ok(services) => match services.provider.health_check().await {
            Ok(true) => {
                println!("  ✅ Provider '{}' reachable", services.provider.name());
                match services.provider.list_models().await {
                    Ok(models) if models.is_empty() => {
                        println!("  ⚠️  Provider listed no models, cannot confirm '{}'", config.default_model);
                    }
                    Ok(models) if model_listed(&models, &config.default_model) => {
                        println!("  ✅ Model '{}' available", config.default_model);
                    }
                    Ok(models) => {
                        println!(
                            "  ❌ Model '{}' not offered ({} models listed)",
                            config.default_model,
                            models.len()
                        );
                        issues += 1;
                    }
                    Err(e) => println!("  ⚠️  Could not list models: {e}"),
                }
            }
            Ok(false) => {
                println!("  ⚠️  Provider '{}' answered but reported unhealthy", services.provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", services.provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Could not set up services: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Some providers list ids with a `models/` style prefix.
fn model_listed(models: &[String], model: &str) -> bool {
    models
        .iter()
        .any(|id| id == model || id.rsplit('/').next() == Some(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_matches_with_or_without_prefix() {
        let models = vec!["models/gemini-1.5-flash".to_string(), "gpt-4o".to_string()];
        assert!(model_listed(&models, "gemini-1.5-flash"));
        assert!(model_listed(&models, "gpt-4o"));
        assert!(!model_listed(&models, "gemini-1.5"));
        assert!(!model_listed(&[], "gpt-4o"));
    }
}
