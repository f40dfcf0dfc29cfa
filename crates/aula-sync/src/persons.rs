//! Person synchronization and auxiliary-account provisioning.

use std::sync::Arc;
use tracing::{info, warn};

use aula_core::{AccountId, Role};
use aula_db::models::Person;
use aula_db::SourceStore;
use aula_lms::{LmsApi, NewAccount};

use crate::summary::PhaseSummary;

/// Interface language for accounts created by the sync.
const ACCOUNT_LANGUAGE: &str = "es";

/// Auxiliary accounts never log in interactively.
const LOCKED_PASSWORD: &str = "!";

/// The three auxiliary (proxy) account profiles, provisioned on demand in
/// proxy mode: (username, first name, role).
const PROXY_PROFILES: [(&str, &str, Role); 3] = [
    ("aux_student", "Student", Role::Student),
    ("aux_tutor", "Tutor", Role::Teacher),
    ("aux_admin", "Admin", Role::Admin),
];

/// Person-to-account synchronization.
pub struct PersonSync {
    store: Arc<dyn SourceStore>,
    lms: Arc<dyn LmsApi>,
}

impl PersonSync {
    /// Creates the phase over the two platforms.
    pub fn new(store: Arc<dyn SourceStore>, lms: Arc<dyn LmsApi>) -> Self {
        Self { store, lms }
    }

    /// Synchronizes every unlinked person.
    pub async fn sync(&self) -> PhaseSummary {
        let mut summary = PhaseSummary::new();

        let persons = match self.store.unlinked_persons().await {
            Ok(persons) => persons,
            Err(e) => {
                warn!(error = %e, "Could not list unlinked persons");
                summary.extra_error();
                return summary;
            }
        };

        info!(count = persons.len(), "Synchronizing users...");

        for person in &persons {
            self.sync_person(person, &mut summary).await;
        }

        if summary.remaining() == 0 {
            info!("User synchronization done");
        } else {
            info!(remaining = summary.remaining(), "Remaining users to sync");
        }

        summary
    }

    /// Links a person to an existing account by username, creating the
    /// account first when there is none.
    async fn sync_person(&self, person: &Person, summary: &mut PhaseSummary) {
        let account_id = match self.lms.find_account_by_username(&person.username).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                let account = NewAccount {
                    username: person.username.clone(),
                    password_hash: person.password_hash.clone(),
                    first_name: person.first_name.clone(),
                    last_name: person.full_last_name(),
                    email: person.email.clone(),
                    language: ACCOUNT_LANGUAGE.to_string(),
                };
                match self.lms.create_account(&account).await {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(username = %person.username, error = %e, "Account creation failed");
                        summary.failure();
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(username = %person.username, error = %e, "Account lookup failed");
                summary.failure();
                return;
            }
        };

        match self.store.set_person_link(person.id, account_id).await {
            Ok(true) => summary.success(),
            Ok(false) => {
                warn!(person_id = person.id, %account_id, "Person link update matched no row");
                summary.failure();
            }
            Err(e) => {
                warn!(person_id = person.id, %account_id, error = %e, "Person link update failed");
                summary.failure();
            }
        }
    }

    /// Looks up the three auxiliary accounts, creating any that are absent.
    ///
    /// Returns the accounts available for auxiliary enrolment plus the
    /// number of provisioning failures.
    pub async fn ensure_proxy_accounts(&self) -> (Vec<(AccountId, Role)>, u64) {
        info!("Preparing auxiliary users...");
        let mut accounts = Vec::new();
        let mut errors: u64 = 0;

        for (username, first_name, role) in PROXY_PROFILES {
            match self.lms.find_account_by_username(username).await {
                Ok(Some(id)) => accounts.push((id, role)),
                Ok(None) => {
                    let account = NewAccount {
                        username: username.to_string(),
                        password_hash: LOCKED_PASSWORD.to_string(),
                        first_name: first_name.to_string(),
                        last_name: "Auxiliary".to_string(),
                        email: "auxiliary@example.com".to_string(),
                        language: ACCOUNT_LANGUAGE.to_string(),
                    };
                    match self.lms.create_account(&account).await {
                        Ok(id) => accounts.push((id, role)),
                        Err(e) => {
                            warn!(username, error = %e, "Error creating auxiliary user");
                            errors += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(username, error = %e, "Auxiliary user lookup failed");
                    errors += 1;
                }
            }
        }

        (accounts, errors)
    }
}
