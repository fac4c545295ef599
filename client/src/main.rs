use std::rc::Rc;

use atm_wallet_lib::config::init_client_config_from_env;
use atm_wallet_lib::{
    ChallengeView, HttpTransport, OperationResponse, SessionView, TransactionKind, WalletContext,
    WalletError,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
Commands:
  connect             request account access and bind the ATM contract
  balance             refresh the balance
  challenge           show the captcha
  verify <input>      submit the captcha
  regenerate          draw a new captcha
  deposit <amount>    deposit into the ATM contract
  withdraw <amount>   withdraw from the ATM contract
  statement           print the account statement
  status              show the session
  help                show this help
  quit                exit";

type Context = WalletContext<HttpTransport>;

fn to_frontend_error(err: WalletError) -> String {
    err.to_string()
}

fn render_session(view: &SessionView) -> String {
    format!(
        "provider: {}\naccount: {}\ncontract bound: {}\nbalance: {}\ncaptcha: {}",
        if view.provider_present { "present" } else { "missing" },
        view.account.as_deref().unwrap_or("not connected"),
        view.contract_bound,
        view.balance.as_deref().unwrap_or("unknown"),
        if !view.requires_verification {
            "not required"
        } else if view.verification_passed {
            "verified"
        } else {
            "pending"
        }
    )
}

fn render_challenge(context: &Context) -> String {
    let view = ChallengeView {
        challenge: context.gate().challenge_text(),
        passed: context.gate().verification_passed(),
    };
    if view.passed {
        format!("Captcha {} (verified)", view.challenge)
    } else {
        format!("Captcha: {}", view.challenge)
    }
}

fn render_operation(response: &OperationResponse) -> String {
    format!(
        "{} of {} confirmed. Balance: {}",
        response.record.action,
        response.record.amount,
        response.session.balance.as_deref().unwrap_or("unknown")
    )
}

async fn run_operation(context: &Context, kind: TransactionKind, amount: &str) -> String {
    match context.request_operation(kind, amount).await {
        Ok(response) => render_operation(&response),
        Err(err) => to_frontend_error(err),
    }
}

/// Run one command line. Returns `None` when the user asks to quit.
async fn dispatch(context: &Context, line: &str) -> Option<String> {
    let (command, argument) = match line.split_once(' ') {
        Some((command, argument)) => (command, argument),
        None => (line, ""),
    };

    let output = match command {
        "" => return Some(String::new()),
        "quit" | "exit" => return None,
        "help" => HELP.to_string(),
        "connect" => match context.connect().await {
            Ok(view) => render_session(&view),
            Err(err) => to_frontend_error(err),
        },
        "balance" => {
            let view = context.refresh_balance().await;
            format!("Balance: {}", view.balance.as_deref().unwrap_or("unknown"))
        }
        "challenge" => render_challenge(context),
        "verify" => match context.gate().submit_verification(argument) {
            Ok(()) => "Captcha verified".to_string(),
            Err(err) => to_frontend_error(err),
        },
        "regenerate" => match context.gate().regenerate_challenge() {
            Ok(text) => format!("Captcha: {}", text),
            Err(err) => to_frontend_error(err),
        },
        "deposit" => run_operation(context, TransactionKind::Deposit, argument).await,
        "withdraw" => run_operation(context, TransactionKind::Withdrawal, argument).await,
        "statement" => match context.gate().generate_statement() {
            Ok(statement) => statement.to_string(),
            Err(err) => to_frontend_error(err),
        },
        "status" => render_session(&context.session_view()),
        other => format!("Unknown command '{}'. Type 'help' for commands.", other),
    };
    Some(output)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = init_client_config_from_env()?;
    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    let transport = Rc::new(HttpTransport::new(config.rpc_endpoint()?)?);
    log::info!("Using JSON-RPC endpoint {}", transport.base_url());
    let context = WalletContext::initialize(transport, true, config)?;

    let view = context.resume().await;
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{}\n{}\n", render_session(&view), HELP).as_bytes())
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match dispatch(&context, line.trim_end_matches(['\r', '\n'])).await {
            Some(output) if output.is_empty() => {}
            Some(output) => stdout.write_all(format!("{}\n", output).as_bytes()).await?,
            None => break,
        }
    }

    Ok(())
}
