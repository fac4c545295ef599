//! EIP-1193 transport over `window.ethereum`.

use std::time::Duration;

use async_trait::async_trait;
use atm_wallet_lib::{RpcTransport, WalletError, WalletResult};
use js_sys::{Function, Promise, Reflect};
use serde_json::{json, Value};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::{js_to_rust, rust_to_js};

pub struct BrowserTransport {
    ethereum: JsValue,
    request: Option<Function>,
}

impl BrowserTransport {
    /// Look up the injected provider on `window`.
    pub fn detect() -> Self {
        let ethereum = web_sys::window()
            .and_then(|window| Reflect::get(&window, &"ethereum".into()).ok())
            .filter(|value| !value.is_undefined() && !value.is_null())
            .unwrap_or(JsValue::UNDEFINED);

        let request = Reflect::get(&ethereum, &"request".into())
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok());

        if request.is_none() {
            log::warn!("No injected Ethereum provider found");
        }
        Self { ethereum, request }
    }

    pub fn is_present(&self) -> bool {
        self.request.is_some()
    }
}

#[async_trait(?Send)]
impl RpcTransport for BrowserTransport {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        let request = self.request.as_ref().ok_or(WalletError::NoProvider)?;

        let args = rust_to_js(&json!({ "method": method, "params": params }))
            .map_err(|_| WalletError::ValidationError(format!("Unencodable {} params", method)))?;
        let pending = request
            .call1(&self.ethereum, &args)
            .map_err(provider_error)?;

        let result = JsFuture::from(Promise::resolve(&pending))
            .await
            .map_err(provider_error)?;
        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        js_to_rust(&result).map_err(|_| {
            WalletError::InvalidResponse(format!("{} returned an unreadable result", method))
        })
    }

    async fn pause(&self, duration: Duration) {
        let millis = duration.as_millis().min(i32::MAX as u128) as i32;
        let timer = Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().map(|window| {
                window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
            });
            if !matches!(scheduled, Some(Ok(_))) {
                let _ = resolve.call0(&JsValue::UNDEFINED);
            }
        });
        let _ = JsFuture::from(timer).await;
    }
}

/// Provider errors are objects with a numeric `code` and a `message`.
fn provider_error(value: JsValue) -> WalletError {
    let message = Reflect::get(&value, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| value.as_string())
        .unwrap_or_else(|| "unknown provider error".to_string());

    match Reflect::get(&value, &"code".into())
        .ok()
        .and_then(|c| c.as_f64())
    {
        Some(code) => WalletError::RpcError {
            code: code as i64,
            message,
        },
        None => WalletError::NetworkError(message),
    }
}
