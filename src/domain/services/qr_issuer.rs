use std::sync::Arc;
use rand::Rng;
use tracing::{error, info, warn};
use crate::domain::{
    models::attendee::{Attendee, AttendeeStatus},
    ports::AttendeeRepository,
};
use crate::error::AppError;

const CODE_PREFIX: &str = "GAL";
// No 0/O, 1/I/L: codes are read aloud and typed in by hand at the door.
const ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";
const RANDOM_LEN: usize = 16;
const FRAGMENT_LEN: usize = 6;
const MAX_CODE_LEN: usize = 64;

pub type CodeGenerator = dyn Fn(&str, &str) -> String + Send + Sync;

/// How the freshly minted code reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueMode {
    /// The confirmed attendee does not exist yet and is inserted with its code.
    NewRecord,
    /// The stored attendee is still `pending`; promote it and bind the code in one conditional update.
    Promote,
}

pub struct QrIssuer {
    repo: Arc<dyn AttendeeRepository>,
    max_attempts: u32,
    generate: Arc<CodeGenerator>,
}

impl QrIssuer {
    pub fn new(repo: Arc<dyn AttendeeRepository>, max_attempts: u32) -> Self {
        Self::with_generator(repo, max_attempts, Arc::new(Self::mint))
    }

    pub fn with_generator(repo: Arc<dyn AttendeeRepository>, max_attempts: u32, generate: Arc<CodeGenerator>) -> Self {
        Self { repo, max_attempts: max_attempts.max(1), generate }
    }

    /// `GAL-<event>-<name>-<random>`: the event and name fragments only help a
    /// human at the door, all the entropy lives in the random part.
    pub fn mint(scope: &str, name_hint: &str) -> String {
        let scope = fragment(scope, |c| c.is_ascii_alphanumeric()).unwrap_or_else(|| "EVT".into());
        let name = fragment(name_hint, |c| c.is_ascii_alphabetic()).unwrap_or_else(|| "GUEST".into());

        let mut rng = rand::thread_rng();
        let random: String = (0..RANDOM_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();

        format!("{CODE_PREFIX}-{scope}-{name}-{random}")
    }

    /// Camera scans and codes typed in by staff go through the same normalization.
    pub fn normalize(raw: &str) -> Result<String, AppError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(AppError::Validation("qr_code is required".into()));
        }
        if code.len() > MAX_CODE_LEN {
            return Err(AppError::Validation("qr_code is too long".into()));
        }
        if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-') {
            return Err(AppError::Validation("qr_code contains invalid characters".into()));
        }
        Ok(code)
    }

    pub async fn issue(&self, attendee: &Attendee, mode: IssueMode, scope: &str, name_hint: &str) -> Result<Attendee, AppError> {
        if attendee.status != AttendeeStatus::Confirmed {
            return Err(AppError::InvalidState(format!(
                "A QR code can only be issued to a confirmed attendee (attendee is {})",
                attendee.status
            )));
        }
        if attendee.qr_code.is_some() {
            return Err(AppError::InvalidState("Attendee already holds a QR code".into()));
        }

        for attempt in 1..=self.max_attempts {
            let mut candidate = attendee.clone();
            candidate.qr_code = Some((self.generate)(scope, name_hint));

            let stored = match mode {
                IssueMode::NewRecord => self.repo.insert(&candidate).await.map(Some),
                IssueMode::Promote => self.repo.compare_and_swap(&candidate, AttendeeStatus::Pending).await,
            };

            match stored {
                Ok(Some(stored)) => {
                    info!(attendee_id = %stored.id, attempt, "QR code issued");
                    return Ok(stored);
                }
                Ok(None) => {
                    return Err(AppError::InvalidState("Attendee is no longer pending".into()));
                }
                Err(e) if e.is_unique_violation("qr_code") => {
                    warn!(attendee_id = %attendee.id, attempt, "QR code collision, minting a new one");
                }
                Err(e) => return Err(e),
            }
        }

        error!(attendee_id = %attendee.id, attempts = self.max_attempts, "Giving up on QR code issuance");
        Err(AppError::IssuanceExhausted(self.max_attempts))
    }
}

fn fragment(source: &str, keep: impl Fn(char) -> bool) -> Option<String> {
    let fragment: String = source.chars()
        .filter(|c| keep(*c))
        .take(FRAGMENT_LEN)
        .collect::<String>()
        .to_ascii_uppercase();
    (!fragment.is_empty()).then_some(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::attendee::Identity;
    use crate::domain::services::attendance::{apply, Trigger};
    use async_trait::async_trait;
    use chrono::Utc;

    struct UnreachableRepo;

    #[async_trait]
    impl AttendeeRepository for UnreachableRepo {
        async fn insert(&self, _attendee: &Attendee) -> Result<Attendee, AppError> { unreachable!() }
        async fn find_by_id(&self, _id: &str) -> Result<Option<Attendee>, AppError> { unreachable!() }
        async fn find_by_qr_code(&self, _qr_code: &str) -> Result<Option<Attendee>, AppError> { unreachable!() }
        async fn find_by_identity(&self, _event_id: &str, _identity: &Identity) -> Result<Option<Attendee>, AppError> { unreachable!() }
        async fn list_by_event(&self, _event_id: &str) -> Result<Vec<Attendee>, AppError> { unreachable!() }
        async fn compare_and_swap(&self, _updated: &Attendee, _expected: AttendeeStatus) -> Result<Option<Attendee>, AppError> { unreachable!() }
    }

    fn issuer() -> QrIssuer {
        QrIssuer::new(Arc::new(UnreachableRepo), 5)
    }

    #[test]
    fn test_minted_code_shape() {
        let code = QrIssuer::mint("summer-gala-2025", "José Müller");

        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 4, "unexpected code {code}");
        assert_eq!(parts[0], "GAL");
        assert_eq!(parts[1], "SUMMER");
        assert_eq!(parts[2], "JOSMLL");
        assert_eq!(parts[3].len(), RANDOM_LEN);
        assert!(parts[3].bytes().all(|b| ALPHABET.contains(&b)));
        assert_eq!(QrIssuer::normalize(&code).unwrap(), code);
    }

    #[test]
    fn test_minted_codes_differ() {
        let a = QrIssuer::mint("gala", "Ana");
        let b = QrIssuer::mint("gala", "Ana");
        assert_ne!(a, b);
    }

    #[test]
    fn test_mint_falls_back_when_hints_are_unusable() {
        let code = QrIssuer::mint("---", "李雷");
        assert!(code.starts_with("GAL-EVT-GUEST-"), "unexpected code {code}");
    }

    #[test]
    fn test_normalize_accepts_manual_entry() {
        assert_eq!(QrIssuer::normalize("  gal-gala-ana-abcd2345  \n").unwrap(), "GAL-GALA-ANA-ABCD2345");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(QrIssuer::normalize("   "), Err(AppError::Validation(_))));
        assert!(matches!(QrIssuer::normalize("GAL-ANA; DROP TABLE"), Err(AppError::Validation(_))));
        assert!(matches!(QrIssuer::normalize(&"A".repeat(MAX_CODE_LEN + 1)), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_issue_requires_confirmed_attendee() {
        let pending = Attendee::pending("ev".into(), Identity::User { user_id: "u".into() }, Utc::now());
        let result = issuer().issue(&pending, IssueMode::NewRecord, "gala", "ana").await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));

        let present = Attendee::manual_present("ev".into(), Identity::User { user_id: "u".into() }, 0, Utc::now());
        let result = issuer().issue(&present, IssueMode::NewRecord, "gala", "ana").await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_issue_refuses_second_code() {
        let pending = Attendee::pending("ev".into(), Identity::User { user_id: "u".into() }, Utc::now());
        let mut confirmed = apply(&pending, &Trigger::ConfirmRsvp { companions: 0 }, Utc::now()).unwrap();
        confirmed.qr_code = Some("GAL-EV-ANA-ALREADY".into());

        let result = issuer().issue(&confirmed, IssueMode::Promote, "gala", "ana").await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
