//! Human-verification gate in front of monetary operations, and the
//! session-scoped ledger of what went through it.

use parking_lot::RwLock;

use crate::blockchain::Amount;
use crate::errors::{WalletError, WalletResult};
use crate::ledger::{Ledger, Statement, TransactionKind, TransactionRecord};
use crate::provider::{ContractBinder, WalletProvider};
use crate::session::SessionController;
use crate::validation::InputValidator;
use crate::verification::VerificationChallenge;

pub struct TransactionGate<P, B: ContractBinder> {
    session: SessionController<P, B>,
    require_verification: bool,
    validator: InputValidator,
    challenge: RwLock<VerificationChallenge>,
    ledger: RwLock<Ledger>,
}

impl<P: WalletProvider, B: ContractBinder> TransactionGate<P, B> {
    pub fn new(session: SessionController<P, B>, require_verification: bool) -> Self {
        Self::with_challenge(session, require_verification, VerificationChallenge::generate())
    }

    pub fn with_challenge(
        session: SessionController<P, B>,
        require_verification: bool,
        challenge: VerificationChallenge,
    ) -> Self {
        Self {
            session,
            require_verification,
            validator: InputValidator::new(),
            challenge: RwLock::new(challenge),
            ledger: RwLock::new(Ledger::new()),
        }
    }

    pub fn session(&self) -> &SessionController<P, B> {
        &self.session
    }

    pub fn requires_verification(&self) -> bool {
        self.require_verification
    }

    pub fn challenge_text(&self) -> String {
        self.challenge.read().expected_text()
    }

    pub fn verification_passed(&self) -> bool {
        self.challenge.read().is_passed()
    }

    /// Draw a fresh challenge. Refused once the current one has been passed.
    pub fn regenerate_challenge(&self) -> WalletResult<String> {
        let mut challenge = self.challenge.write();
        if challenge.is_passed() {
            return Err(WalletError::ValidationError(
                "Captcha already verified".to_string(),
            ));
        }
        challenge.regenerate_with(&mut rand::thread_rng());
        Ok(challenge.expected_text())
    }

    pub fn submit_verification(&self, input: &str) -> WalletResult<()> {
        if self.challenge.write().submit(input) {
            log::info!("Captcha verified");
            Ok(())
        } else {
            log::debug!("Captcha mismatch");
            Err(WalletError::VerificationFailed)
        }
    }

    /// Gate, validate and issue an operation; record it once confirmed.
    pub async fn request_operation(
        &self,
        kind: TransactionKind,
        amount: &str,
    ) -> WalletResult<TransactionRecord> {
        if self.require_verification && !self.verification_passed() {
            return Err(WalletError::VerificationRequired);
        }

        let amount: Amount = self.validator.validate_amount(amount)?;

        if !self.session.snapshot().is_bound() {
            return Err(WalletError::NotBound);
        }

        if let Err(err) = self.session.issue_operation(kind, amount).await {
            log::warn!("{} of {} failed: {}", kind, amount, err);
            return Err(err);
        }

        let record = TransactionRecord::new(kind, amount);
        self.ledger.write().append(record.clone());
        log::info!("{} of {} recorded", kind, amount);
        Ok(record)
    }

    pub fn ledger(&self) -> Vec<TransactionRecord> {
        self.ledger.read().records().to_vec()
    }

    pub fn generate_statement(&self) -> WalletResult<Statement> {
        let balance = self
            .session
            .snapshot()
            .balance()
            .ok_or(WalletError::BalanceUnavailable)?;
        Ok(Statement::new(balance, self.ledger()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::rc::Rc;
    use tokio::sync::oneshot;

    type Gate = TransactionGate<MockWallet, MockBinder>;

    fn known_challenge() -> VerificationChallenge {
        VerificationChallenge::from_chars(['A', '3', 'B', '7']).unwrap()
    }

    fn gate(require_verification: bool) -> (Gate, Rc<MockLedger>) {
        let (session, ledger) = session_controller(Some(MockWallet::with_accounts(&[ALICE])));
        (
            TransactionGate::with_challenge(session, require_verification, known_challenge()),
            ledger,
        )
    }

    async fn connected_and_verified() -> (Gate, Rc<MockLedger>) {
        let (gate, ledger) = gate(true);
        gate.session().connect().await.unwrap();
        gate.submit_verification("A3B7").unwrap();
        (gate, ledger)
    }

    #[tokio::test]
    async fn unverified_request_is_refused_without_remote_calls() {
        let (gate, ledger) = gate(true);
        gate.session().connect().await.unwrap();

        assert_eq!(
            gate.request_operation(TransactionKind::Deposit, "1").await,
            Err(WalletError::VerificationRequired)
        );
        // Refused before the amount is even looked at.
        assert_eq!(
            gate.request_operation(TransactionKind::Deposit, "").await,
            Err(WalletError::VerificationRequired)
        );
        assert_eq!(ledger.remote_calls(), 0);
        assert!(gate.ledger().is_empty());
    }

    #[tokio::test]
    async fn fresh_session_refuses_before_connecting() {
        let (gate, ledger) = gate(true);
        assert_eq!(
            gate.request_operation(TransactionKind::Withdrawal, "1").await,
            Err(WalletError::VerificationRequired)
        );
        assert_eq!(ledger.remote_calls(), 0);
    }

    #[tokio::test]
    async fn ungated_variant_only_checks_amount_and_binding() {
        let (gate, ledger) = gate(false);

        assert!(matches!(
            gate.request_operation(TransactionKind::Deposit, "").await,
            Err(WalletError::InvalidAmount(_))
        ));
        assert_eq!(
            gate.request_operation(TransactionKind::Deposit, "3").await,
            Err(WalletError::NotBound)
        );

        gate.session().connect().await.unwrap();
        ledger.queue_balance(Ok(3));
        let record = gate
            .request_operation(TransactionKind::Deposit, "3")
            .await
            .unwrap();
        assert_eq!(record.amount, Amount::from_units(3));
        assert!(!gate.verification_passed());
    }

    #[tokio::test]
    async fn invalid_amount_is_rejected_after_verification() {
        let (gate, ledger) = connected_and_verified().await;
        for bad in ["", "abc", "-1", "1.5", " 1"] {
            assert!(
                matches!(
                    gate.request_operation(TransactionKind::Deposit, bad).await,
                    Err(WalletError::InvalidAmount(_))
                ),
                "{:?} should be rejected",
                bad
            );
        }
        assert_eq!(ledger.remote_calls(), 0);
    }

    #[tokio::test]
    async fn ledger_follows_successful_operations_in_completion_order() {
        let (gate, ledger) = connected_and_verified().await;
        for balance in [5, 3, 10] {
            ledger.queue_balance(Ok(balance));
        }

        gate.request_operation(TransactionKind::Deposit, "5").await.unwrap();
        gate.request_operation(TransactionKind::Withdrawal, "2").await.unwrap();
        ledger.queue_outcome(Outcome::Revert);
        assert!(gate
            .request_operation(TransactionKind::Deposit, "9")
            .await
            .is_err());
        gate.request_operation(TransactionKind::Deposit, "7").await.unwrap();

        let records = gate.ledger();
        let summary: Vec<_> = records
            .iter()
            .map(|r| (r.action, r.amount.units()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TransactionKind::Deposit, 5),
                (TransactionKind::Withdrawal, 2),
                (TransactionKind::Deposit, 7),
            ]
        );
        assert_eq!(gate.session().snapshot().balance(), Some(10));
    }

    #[tokio::test]
    async fn concurrent_operations_are_recorded_as_they_confirm() {
        let (gate, ledger) = connected_and_verified().await;

        let (release_deposit, deposit_gate) = oneshot::channel();
        let (release_withdrawal, withdrawal_gate) = oneshot::channel();
        ledger.queue_outcome(Outcome::Gated(deposit_gate));
        ledger.queue_outcome(Outcome::Gated(withdrawal_gate));
        ledger.queue_balance(Ok(8));
        ledger.queue_balance(Ok(6));

        let withdrawal_done = Cell::new(false);
        let deposit = gate.request_operation(TransactionKind::Deposit, "1");
        let withdrawal = async {
            let result = gate
                .request_operation(TransactionKind::Withdrawal, "2")
                .await;
            withdrawal_done.set(true);
            result
        };
        let driver = async {
            tokio::task::yield_now().await;
            release_withdrawal.send(Ok(())).unwrap();
            while !withdrawal_done.get() {
                tokio::task::yield_now().await;
            }
            release_deposit.send(Ok(())).unwrap();
        };

        let (deposit, withdrawal, ()) = tokio::join!(deposit, withdrawal, driver);
        deposit.unwrap();
        withdrawal.unwrap();

        let summary: Vec<_> = gate
            .ledger()
            .iter()
            .map(|r| (r.action, r.amount.units()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TransactionKind::Withdrawal, 2),
                (TransactionKind::Deposit, 1),
            ]
        );
        // The deposit confirmed last, so its refresh is the one that stuck.
        assert_eq!(gate.session().snapshot().balance(), Some(6));
    }

    #[tokio::test]
    async fn failed_operation_keeps_balance_and_verification() {
        let (gate, ledger) = connected_and_verified().await;
        ledger.queue_balance(Ok(8));
        gate.session().refresh_balance().await;

        ledger.queue_outcome(Outcome::RejectSubmission);
        let failed = gate.request_operation(TransactionKind::Withdrawal, "2").await;
        assert!(matches!(failed, Err(WalletError::RemoteOperationFailed(_))));
        assert!(gate.ledger().is_empty());
        assert_eq!(gate.session().snapshot().balance(), Some(8));
        assert!(gate.verification_passed());

        ledger.queue_balance(Ok(6));
        gate.request_operation(TransactionKind::Withdrawal, "2")
            .await
            .unwrap();
        assert_eq!(gate.ledger().len(), 1);
        assert_eq!(gate.session().snapshot().balance(), Some(6));
    }

    #[test]
    fn verification_is_exact() {
        let (gate, _) = gate(true);

        assert_eq!(
            gate.submit_verification("a3B7"),
            Err(WalletError::VerificationFailed)
        );
        assert_eq!(
            gate.submit_verification("A37B"),
            Err(WalletError::VerificationFailed)
        );
        assert!(!gate.verification_passed());

        gate.submit_verification("A3B7").unwrap();
        assert!(gate.verification_passed());
    }

    #[test]
    fn regenerate_is_refused_once_passed() {
        let (gate, _) = gate(true);

        let text = gate.regenerate_challenge().unwrap();
        assert_eq!(text, gate.challenge_text());
        assert_eq!(text.len(), 4);

        let challenge = VerificationChallenge::generate_with(&mut StdRng::seed_from_u64(3));
        let expected = challenge.expected_text();
        let (session, _) = session_controller(None);
        let gate = TransactionGate::with_challenge(session, true, challenge);
        gate.submit_verification(&expected).unwrap();

        assert!(matches!(
            gate.regenerate_challenge(),
            Err(WalletError::ValidationError(_))
        ));
        assert_eq!(gate.challenge_text(), expected);
        assert!(gate.verification_passed());
    }

    #[test]
    fn statement_requires_known_balance() {
        let (gate, ledger) = gate(true);
        assert_eq!(
            gate.generate_statement(),
            Err(WalletError::BalanceUnavailable)
        );
        assert_eq!(ledger.remote_calls(), 0);
        assert!(gate.ledger().is_empty());
    }

    #[tokio::test]
    async fn statement_lists_ledger_and_balance() {
        let (gate, ledger) = connected_and_verified().await;
        ledger.queue_balance(Ok(4));
        gate.request_operation(TransactionKind::Deposit, "4").await.unwrap();

        let statement = gate.generate_statement().unwrap();
        assert_eq!(statement.balance, 4);
        assert_eq!(statement.entries.len(), 1);
        assert!(statement.entry_lines()[0].starts_with("1. Deposit - 4 ("));
    }
}
