use anyhow::Context;
use clap::Parser;
use dib_migrate::config::cli::{Command, LogFormat};
use dib_migrate::config::toml_config::StoreKind;
use dib_migrate::core::DocumentStore;
use dib_migrate::utils::error::{ErrorSeverity, MigratorError};
use dib_migrate::utils::{logger, validation::Validate};
use dib_migrate::{
    BackupFileStore, BackupPipeline, CliArgs, EtlEngine, FirestoreConnection, LocalStorage,
    MigratePipeline, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    match args.log_format {
        LogFormat::Compact => logger::init_cli_logger(args.verbose),
        LogFormat::Json => logger::init_json_logger(),
    }

    tracing::info!("🚀 Starting dib-migrate");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;
    args.apply_overrides(&mut config);

    // show 不需要有效配置，先顯示摘要再回報驗證結果
    if matches!(args.command, Command::Show) {
        println!("{}", config.summary());
        println!();
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            }
        }
        return Ok(());
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    let result = match config.store.r#type {
        StoreKind::Firestore => {
            let connection = FirestoreConnection::open(config.firestore_settings()?)?;
            run(connection, config, &args.command).await
        }
        StoreKind::BackupFile => {
            let path = config.store.backup_file.clone().unwrap_or_default();
            let store = BackupFileStore::open(&path)
                .with_context(|| format!("failed to open backup file '{}'", path))?;
            run(store, config, &args.command).await
        }
    };

    match result {
        Ok(output_path) => {
            tracing::info!("✅ Run completed successfully!");
            println!("✅ Run completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

/// The store is dropped, and its connection released, when this returns.
async fn run<D: DocumentStore>(
    store: D,
    config: TomlConfig,
    command: &Command,
) -> Result<String, MigratorError> {
    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match command {
        Command::Backup { .. } => {
            let storage = LocalStorage::new(config.backup.output_path.clone());
            let pipeline = BackupPipeline::new(store, storage, config);
            EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
                .run()
                .await
        }
        Command::Migrate { .. } => {
            let storage = LocalStorage::new(config.migrate.output_path.clone());
            let pipeline = MigratePipeline::new(store, storage, config);
            EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
                .run()
                .await
        }
        Command::Show => Ok(String::new()),
    }
}
