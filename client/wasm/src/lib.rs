//! ATM Wallet WebAssembly Library
//!
//! Browser binding for the ATM wallet client: the injected Ethereum
//! provider becomes the RPC transport, and the session, captcha gate and
//! ledger are exposed to JavaScript as the `AtmApp` class.

use atm_wallet_lib::WalletError;
use serde::{de::DeserializeOwned, Serialize};
use wasm_bindgen::prelude::*;

mod app;
mod provider;

pub use app::AtmApp;
pub use provider::BrowserTransport;

pub type WasmResult<T> = Result<T, JsValue>;

/// Error object handed to JavaScript as `{ code, message }`.
#[derive(Debug, Clone, Serialize)]
pub struct WasmError {
    pub code: String,
    pub message: String,
}

impl WasmError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<WasmError> for JsValue {
    fn from(err: WasmError) -> Self {
        serde_wasm_bindgen::to_value(&err)
            .unwrap_or_else(|_| JsValue::from_str(&format!("{}: {}", err.code, err.message)))
    }
}

impl From<WalletError> for WasmError {
    fn from(err: WalletError) -> Self {
        let code = match &err {
            WalletError::NoProvider => "NO_PROVIDER",
            WalletError::ConnectionDenied(_) => "CONNECTION_DENIED",
            WalletError::NotBound => "NOT_BOUND",
            WalletError::VerificationFailed => "VERIFICATION_FAILED",
            WalletError::VerificationRequired => "VERIFICATION_REQUIRED",
            WalletError::InvalidAmount(_) => "INVALID_AMOUNT",
            WalletError::BalanceUnavailable => "BALANCE_UNAVAILABLE",
            WalletError::RemoteOperationFailed(_) => "REMOTE_OPERATION_FAILED",
            WalletError::NetworkError(_) => "NETWORK_ERROR",
            WalletError::RpcError { .. } => "RPC_ERROR",
            WalletError::InvalidResponse(_) => "INVALID_RESPONSE",
            WalletError::ValidationError(_) => "VALIDATION_ERROR",
            WalletError::InvalidAddress(_) => "INVALID_ADDRESS",
        };
        WasmError::new(code, &err.to_string())
    }
}

pub(crate) fn wallet_error(err: WalletError) -> JsValue {
    WasmError::from(err).into()
}

/// Serialize into plain JS objects (maps become objects, not `Map`s).
pub(crate) fn rust_to_js<T: Serialize + ?Sized>(value: &T) -> WasmResult<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| WasmError::new("SERIALIZATION_ERROR", &e.to_string()).into())
}

pub(crate) fn js_to_rust<T: DeserializeOwned>(value: &JsValue) -> WasmResult<T> {
    serde_wasm_bindgen::from_value(value.clone())
        .map_err(|e| WasmError::new("DESERIALIZATION_ERROR", &e.to_string()).into())
}

/// `log` backend writing to the browser console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

// Module initialization
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
    log::info!("ATM wallet WASM module loaded");
}
