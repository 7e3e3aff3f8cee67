// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Composition root: wires the validated CLI to the cryptree core and maps
//! the result to a process exit code.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cryptree::application::use_cases::{DecryptUseCase, EncryptUseCase, ExtractUseCase, RotateUseCase, SetUseCase, UnsetUseCase, UpdateKeysUseCase};
use cryptree::infrastructure::config::CreationRules;
use cryptree::infrastructure::key_service::{LocalKeyServiceClient, LocalMasterKeyBackend};
use cryptree::infrastructure::stores::{BinaryStore, DotenvStore, IniStore, JsonStore, YamlStore};
use cryptree::infrastructure::value_cipher::AesGcmValueCipher;
use cryptree_domain::entities::Tree;
use cryptree_domain::error::CryptreeError;
use cryptree_domain::repositories::FormatStore;
use cryptree_domain::value_objects::TreeValue;

use cryptree_bootstrap::exit_code::{result_to_exit_code, ExitCode};
use cryptree_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use cryptree_bootstrap::shutdown::{ShutdownCoordinator, DEFAULT_GRACE_PERIOD_SECS};
use cryptree_bootstrap::{bootstrap_cli, ValidatedCli, ValidatedCommand};

#[cfg(unix)]
use cryptree_bootstrap::signals::UnixSignalHandler as PlatformSignalHandler;
#[cfg(windows)]
use cryptree_bootstrap::signals::WindowsSignalHandler as PlatformSignalHandler;
use cryptree_bootstrap::signals::SystemSignals;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let validated_cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {e}");
            return std::process::ExitCode::from(ExitCode::UsageError.as_i32() as u8);
        }
    };

    cryptree::infrastructure::logging::init(validated_cli.verbose);
    let logger = ConsoleLogger::new();
    logger.info("cryptree starting");

    let coordinator = ShutdownCoordinator::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS));
    let token = coordinator.token();
    tokio::spawn(async move {
        PlatformSignalHandler::new()
            .wait_for_signal(Box::new(move || coordinator.initiate_shutdown()))
            .await;
    });

    tokio::select! {
        result = run(validated_cli) => result_to_exit_code(result),
        _ = token.cancelled() => {
            eprintln!("Interrupted");
            std::process::ExitCode::from(ExitCode::Interrupted.as_i32() as u8)
        }
    }
}

/// Runs the validated command end to end: reads the input file, converts it
/// to a tree, applies the use case(s) the command calls for, and (unless
/// the command is read-only) writes the result back out.
async fn run(cli: ValidatedCli) -> Result<(), CryptreeError> {
    let backend = Arc::new(LocalMasterKeyBackend::from_passphrase(&cli.passphrase));
    let key_client = LocalKeyServiceClient::new().with_backend(backend);
    let clients: Vec<&dyn cryptree_domain::services::KeyServiceClient> = vec![&key_client];
    let cipher = AesGcmValueCipher::new();

    match cli.command {
        ValidatedCommand::Encrypt { file, output, rules } => {
            let store = store_for(&file);
            let bytes = read_file(&file).await?;
            let mut tree = load_for_encrypt(store.as_ref(), &bytes, rules.as_deref()).await?;
            EncryptUseCase::new(&cipher, clients).execute(&mut tree).await?;
            save(store.as_ref(), &tree, &file, output.as_deref()).await
        }
        ValidatedCommand::Decrypt { file, output } => {
            let store = store_for(&file);
            let bytes = read_file(&file).await?;
            let mut tree = store.load(&bytes).await?;
            DecryptUseCase::new(&cipher, clients).execute(&mut tree).await?;
            save(store.as_ref(), &tree, &file, output.as_deref()).await
        }
        ValidatedCommand::Rotate { file, output } => {
            let store = store_for(&file);
            let bytes = read_file(&file).await?;
            let mut tree = store.load(&bytes).await?;
            DecryptUseCase::new(&cipher, clients.clone()).execute(&mut tree).await?;
            RotateUseCase::new(&cipher, clients).execute(&mut tree).await?;
            save(store.as_ref(), &tree, &file, output.as_deref()).await
        }
        ValidatedCommand::UpdateKeys { file, output, rules } => {
            let store = store_for(&file);
            let bytes = read_file(&file).await?;
            let mut tree = store.load(&bytes).await?;
            DecryptUseCase::new(&cipher, clients.clone()).execute(&mut tree).await?;

            let rules = CreationRules::load(&rules)?;
            let new_metadata = rules.new_metadata()?;
            UpdateKeysUseCase::new(clients.clone())
                .execute(&mut tree, new_metadata.key_groups, rules.shamir_threshold)
                .await?;
            EncryptUseCase::new(&cipher, clients).execute(&mut tree).await?;
            save(store.as_ref(), &tree, &file, output.as_deref()).await
        }
        ValidatedCommand::Set { file, path, value, output } => {
            let store = store_for(&file);
            let bytes = read_file(&file).await?;
            let mut tree = store.load(&bytes).await?;
            DecryptUseCase::new(&cipher, clients.clone()).execute(&mut tree).await?;
            SetUseCase::execute(&mut tree, &path, parse_cli_value(&value))?;
            EncryptUseCase::new(&cipher, clients).execute(&mut tree).await?;
            save(store.as_ref(), &tree, &file, output.as_deref()).await
        }
        ValidatedCommand::Unset { file, path, output } => {
            let store = store_for(&file);
            let bytes = read_file(&file).await?;
            let mut tree = store.load(&bytes).await?;
            DecryptUseCase::new(&cipher, clients.clone()).execute(&mut tree).await?;
            UnsetUseCase::execute(&mut tree, &path)?;
            EncryptUseCase::new(&cipher, clients).execute(&mut tree).await?;
            save(store.as_ref(), &tree, &file, output.as_deref()).await
        }
        ValidatedCommand::Extract { file, path } => {
            let store = store_for(&file);
            let bytes = read_file(&file).await?;
            let mut tree = store.load(&bytes).await?;
            DecryptUseCase::new(&cipher, clients).execute(&mut tree).await?;
            let value = ExtractUseCase::execute(&tree, &path)?;
            println!("{}", display_value(&value));
            Ok(())
        }
    }
}

/// Loads `bytes` for `encrypt`: the ordinary path if the file already
/// carries a metadata block, otherwise the brand-new-document path using
/// `--rules` to build fresh metadata.
async fn load_for_encrypt(store: &dyn FormatStore, bytes: &[u8], rules: Option<&Path>) -> Result<Tree, CryptreeError> {
    match (store.load(bytes).await, rules) {
        (Ok(tree), _) => Ok(tree),
        (Err(CryptreeError::MetadataMissing), Some(rules_path)) => {
            let metadata = CreationRules::load(rules_path)?.new_metadata()?;
            store.load_new(bytes, metadata).await
        }
        (Err(CryptreeError::MetadataMissing), None) => Err(CryptreeError::invalid_configuration(
            "file has no existing metadata block; pass --rules to encrypt it as a new document",
        )),
        (Err(e), _) => Err(e),
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, CryptreeError> {
    tokio::fs::read(path).await.map_err(|e| CryptreeError::IoError(format!("{}: {e}", path.display())))
}

async fn save(store: &dyn FormatStore, tree: &Tree, input: &Path, output: Option<&Path>) -> Result<(), CryptreeError> {
    let bytes = store.save(tree).await?;
    let target = output.unwrap_or(input);
    tokio::fs::write(target, bytes).await.map_err(|e| CryptreeError::IoError(format!("{}: {e}", target.display())))
}

/// Picks a [`FormatStore`] by file extension (or, for dotenv files with no
/// extension, by filename). Anything unrecognized is treated as opaque
/// binary data.
fn store_for(path: &Path) -> Box<dyn FormatStore> {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    match ext.as_deref() {
        Some("yaml") | Some("yml") => Box::new(YamlStore::new()),
        Some("json") => Box::new(JsonStore::new()),
        Some("ini") | Some("cfg") => Box::new(IniStore::new()),
        Some("env") => Box::new(DotenvStore::new()),
        _ if name == ".env" || name.starts_with(".env.") => Box::new(DotenvStore::new()),
        _ => Box::new(BinaryStore::new()),
    }
}

/// Interprets a raw CLI value for `set`: booleans and integers are
/// recognized by literal spelling, everything else stays a string.
fn parse_cli_value(raw: &str) -> TreeValue {
    match raw {
        "true" => TreeValue::Bool(true),
        "false" => TreeValue::Bool(false),
        _ => raw.parse::<i64>().map(TreeValue::Int).unwrap_or_else(|_| TreeValue::Str(raw.to_string())),
    }
}

/// Renders an extracted leaf for stdout. Containers print as pretty JSON;
/// everything else prints its plain display form.
fn display_value(value: &TreeValue) -> String {
    match value {
        TreeValue::Str(s) => s.clone(),
        TreeValue::Int(i) => i.to_string(),
        TreeValue::Float(f) => f.to_string(),
        TreeValue::Bool(b) => b.to_string(),
        TreeValue::Null => String::new(),
        TreeValue::Bytes(b) => base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b),
        TreeValue::Timestamp(ts) => ts.to_rfc3339(),
        TreeValue::Comment(s) => s.clone(),
        TreeValue::Branch(_) | TreeValue::List(_) => {
            serde_json::to_string_pretty(&value_to_json(value)).unwrap_or_else(|e| format!("<unserializable: {e}>"))
        }
    }
}

/// Converts a tree value into its JSON equivalent for display. Comments are
/// dropped, matching how every format store's `save` path treats them as
/// non-data.
fn value_to_json(value: &TreeValue) -> serde_json::Value {
    match value {
        TreeValue::Str(s) => serde_json::Value::String(s.clone()),
        TreeValue::Int(i) => serde_json::Value::from(*i),
        TreeValue::Float(f) => serde_json::Value::from(*f),
        TreeValue::Bool(b) => serde_json::Value::Bool(*b),
        TreeValue::Null => serde_json::Value::Null,
        TreeValue::Bytes(b) => serde_json::Value::String(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)),
        TreeValue::Timestamp(ts) => serde_json::Value::String(ts.to_rfc3339()),
        TreeValue::Comment(_) => serde_json::Value::Null,
        TreeValue::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        TreeValue::Branch(branch) => {
            let map = branch
                .items()
                .iter()
                .filter(|item| !matches!(item.value, TreeValue::Comment(_)))
                .map(|item| (item.key.as_str().to_string(), value_to_json(&item.value)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}
