//! `AtmApp`: the JavaScript-facing wallet client.

use std::collections::HashMap;
use std::rc::Rc;

use atm_wallet_lib::{
    ChallengeView, ClientConfig, Environment, TransactionKind, WalletContext,
};
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::provider::BrowserTransport;
use crate::{js_to_rust, rust_to_js, wallet_error, WasmResult};

const ENVIRONMENT_KEY: &str = "ENVIRONMENT";

#[wasm_bindgen]
pub struct AtmApp {
    context: Rc<WalletContext<BrowserTransport>>,
}

#[wasm_bindgen]
impl AtmApp {
    /// `overrides` maps configuration keys (`CONTRACT_ADDRESS`,
    /// `REQUIRE_VERIFICATION`, `ENVIRONMENT`, ...) to string values.
    #[wasm_bindgen(constructor)]
    pub fn new(overrides: Option<JsValue>) -> WasmResult<AtmApp> {
        let mut overrides: HashMap<String, String> = match overrides {
            Some(js) if !js.is_undefined() && !js.is_null() => js_to_rust(&js)?,
            _ => HashMap::new(),
        };

        let environment = overrides
            .remove(ENVIRONMENT_KEY)
            .map(|name| Environment::from_name(&name))
            .unwrap_or(Environment::Production);
        let mut config = ClientConfig::new(environment);
        for (key, value) in overrides {
            config.set(key, value);
        }
        config.validate_required_configs().map_err(wallet_error)?;
        log::set_max_level(config.log_level());

        let transport = BrowserTransport::detect();
        let provider_present = transport.is_present();
        let context = WalletContext::initialize(Rc::new(transport), provider_present, &config)
            .map_err(wallet_error)?;

        Ok(AtmApp {
            context: Rc::new(context),
        })
    }

    /// Prompt for account access; resolves to the session view.
    pub fn connect(&self) -> Promise {
        let context = Rc::clone(&self.context);
        future_to_promise(async move {
            let view = context.connect().await.map_err(wallet_error)?;
            rust_to_js(&view)
        })
    }

    /// Reconnect an already authorized account without prompting.
    pub fn resume(&self) -> Promise {
        let context = Rc::clone(&self.context);
        future_to_promise(async move { rust_to_js(&context.resume().await) })
    }

    #[wasm_bindgen(js_name = refreshBalance)]
    pub fn refresh_balance(&self) -> Promise {
        let context = Rc::clone(&self.context);
        future_to_promise(async move { rust_to_js(&context.refresh_balance().await) })
    }

    pub fn deposit(&self, amount: String) -> Promise {
        self.operation(TransactionKind::Deposit, amount)
    }

    pub fn withdraw(&self, amount: String) -> Promise {
        self.operation(TransactionKind::Withdrawal, amount)
    }

    pub fn challenge(&self) -> WasmResult<JsValue> {
        rust_to_js(&self.challenge_view())
    }

    #[wasm_bindgen(js_name = submitVerification)]
    pub fn submit_verification(&self, input: &str) -> WasmResult<JsValue> {
        self.context
            .gate()
            .submit_verification(input)
            .map_err(wallet_error)?;
        rust_to_js(&self.challenge_view())
    }

    #[wasm_bindgen(js_name = regenerateChallenge)]
    pub fn regenerate_challenge(&self) -> WasmResult<JsValue> {
        self.context
            .gate()
            .regenerate_challenge()
            .map_err(wallet_error)?;
        rust_to_js(&self.challenge_view())
    }

    pub fn statement(&self) -> WasmResult<JsValue> {
        let statement = self.context.statement_view().map_err(wallet_error)?;
        rust_to_js(&statement)
    }

    pub fn session(&self) -> WasmResult<JsValue> {
        rust_to_js(&self.context.session_view())
    }

    pub fn ledger(&self) -> WasmResult<JsValue> {
        rust_to_js(&self.context.ledger_view())
    }
}

impl AtmApp {
    fn operation(&self, kind: TransactionKind, amount: String) -> Promise {
        let context = Rc::clone(&self.context);
        future_to_promise(async move {
            let response = context
                .request_operation(kind, &amount)
                .await
                .map_err(wallet_error)?;
            rust_to_js(&response)
        })
    }

    fn challenge_view(&self) -> ChallengeView {
        ChallengeView {
            challenge: self.context.gate().challenge_text(),
            passed: self.context.gate().verification_passed(),
        }
    }
}
