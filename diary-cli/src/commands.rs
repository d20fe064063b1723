use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use diary_core::{
    adapters::{BeaconNotifier, HttpVerifier, MemoryStore, PostgrestStore},
    format_display_time,
    ports::{EntryStore, LockoutNotifier, VerificationBackend},
    AccessGate, AccessPhase, Clock, CredentialVerifier, EntryDraft, EntryId, EntryPreview,
    GateOutcome, ListingController, LoadOutcome, SystemClock, VerifiedSession,
};
use reqwest::Url;
use time::OffsetDateTime;

use crate::{cli::Commands, config::DiaryConfig, session_store};

pub const DEV_PASSWORD: &str = "dev";
const DEV_ENTRIES: usize = 25;
const BEACON_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

pub struct Shell {
    config: DiaryConfig,
    session_dir: PathBuf,
    dev_store: Option<MemoryStore>,
}

impl Shell {
    pub fn new(config: DiaryConfig, session_dir: PathBuf, dev: bool) -> Self {
        Self {
            config,
            session_dir,
            dev_store: dev.then(|| MemoryStore::seeded(DEV_ENTRIES)),
        }
    }

    fn is_dev(&self) -> bool {
        self.dev_store.is_some()
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Unlock => self.unlock().await,
            Commands::Status => self.status(),
            Commands::List { all, pages } => self.list(all, pages).await,
            Commands::Show { id } => self.show(EntryId::new(id)).await,
            Commands::Add { title, body } => self.add(EntryDraft::new(title, body)).await,
            Commands::Delete { id } => self.delete(EntryId::new(id)).await,
            Commands::Logout => self.logout(),
            Commands::ConfigPath => config_path(),
        }
    }

    async fn unlock(&self) -> Result<()> {
        let mode = self.config.mode;
        if self.is_dev() {
            let gate = AccessGate::new(CredentialVerifier::new(mode, DEV_PASSWORD), mode);
            return self.prompt_and_submit(&gate).await;
        }

        let api_url = Url::parse(&self.config.api_url)
            .with_context(|| format!("Invalid API URL: {}", self.config.api_url))?;
        let verifier = HttpVerifier::new(&api_url)?;
        let gate = AccessGate::new(verifier, mode).with_notifier(self.beacon()?);
        let result = self.prompt_and_submit(&gate).await;

        // The process exits right after this; let a lockout report go out first.
        if let Some(beacon) = gate.notifier() {
            beacon.flush(BEACON_FLUSH_TIMEOUT).await;
        }
        result
    }

    fn beacon(&self) -> Result<Option<BeaconNotifier>> {
        self.config
            .beacon_url
            .as_deref()
            .map(|raw| {
                let endpoint =
                    Url::parse(raw).with_context(|| format!("Invalid beacon URL: {}", raw))?;
                Ok(BeaconNotifier::new(endpoint, self.config.page_url.as_str()))
            })
            .transpose()
    }

    async fn prompt_and_submit<B, N>(&self, gate: &AccessGate<B, N>) -> Result<()>
    where
        B: VerificationBackend,
        N: LockoutNotifier,
    {
        let state = session_store::load_access_state(&self.session_dir)?;
        match gate.phase(&state) {
            AccessPhase::Verified => {
                println!("Diary is already unlocked.");
                return Ok(());
            }
            AccessPhase::Locked { until } => bail!(locked_message(until)),
            AccessPhase::Unverified => {}
        }

        let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
        let message = self.submit(gate, &password).await?;
        println!("{message}");
        Ok(())
    }

    /// Runs one gate check and persists the resulting state whatever happens.
    pub async fn submit<B, N>(&self, gate: &AccessGate<B, N>, password: &str) -> Result<String>
    where
        B: VerificationBackend,
        N: LockoutNotifier,
    {
        let mut state = session_store::load_access_state(&self.session_dir)?;
        let outcome = gate.submit_credential(&mut state, password).await;
        session_store::save_access_state(&self.session_dir, &state)?;

        match outcome.context("Could not verify the password")? {
            GateOutcome::Granted(session) => {
                if let Some(credentials) = session.store_credentials() {
                    session_store::save_store_credentials(&self.session_dir, credentials)?;
                }
                Ok("Unlocked.".to_string())
            }
            GateOutcome::Rejected { remaining_attempts } => {
                bail!("Wrong password. {remaining_attempts} attempt(s) left.")
            }
            GateOutcome::Locked { unlock_at, .. } => bail!(locked_message(unlock_at)),
        }
    }

    fn status(&self) -> Result<()> {
        let state = session_store::load_access_state(&self.session_dir)?;
        let line = match state.phase(SystemClock.now()) {
            AccessPhase::Verified => "Unlocked.".to_string(),
            AccessPhase::Locked { until } => locked_message(until),
            AccessPhase::Unverified => format!(
                "Locked. {} attempt(s) left before a lockout.",
                state.remaining_attempts()
            ),
        };
        println!("{line}");
        if self.is_dev() {
            println!("(dev mode, password \"{DEV_PASSWORD}\")");
        }
        Ok(())
    }

    fn controller(&self) -> Result<ListingController<dyn EntryStore>> {
        let state = session_store::load_access_state(&self.session_dir)?;
        let saved = session_store::load_store_credentials(&self.session_dir)?;
        let session = VerifiedSession::resume(&state, saved)
            .context("Diary is locked. Run `diary-cli unlock` first.")?;

        let store: Arc<dyn EntryStore> = match &self.dev_store {
            Some(store) => Arc::new(store.clone()),
            None => {
                let credentials = self
                    .config
                    .store_override()
                    .or_else(|| session.store_credentials().cloned())
                    .context("No store credentials saved. Run `diary-cli logout` and unlock again.")?;
                Arc::new(PostgrestStore::new(&credentials)?)
            }
        };

        Ok(ListingController::new(session, store, self.config.listing))
    }

    async fn list(&self, all: bool, pages: usize) -> Result<()> {
        let controller = self.controller()?;
        self.load(&controller, all, pages).await?;

        let page = controller.snapshot();
        if page.entries().is_empty() {
            println!("No entries yet.");
            return Ok(());
        }
        for entry in page.entries() {
            println!("{}\n", render_entry(entry));
        }
        if !page.end_reached() {
            println!("More entries: diary-cli list --pages {}", pages.max(1) + 1);
        }
        Ok(())
    }

    async fn load(
        &self,
        controller: &ListingController<dyn EntryStore>,
        all: bool,
        pages: usize,
    ) -> Result<()> {
        if all {
            controller.load_all().await?;
            return Ok(());
        }

        controller.load_first_page().await?;
        for _ in 1..pages {
            if controller.load_next_page().await? == LoadOutcome::Skipped {
                break;
            }
        }
        Ok(())
    }

    async fn show(&self, id: EntryId) -> Result<()> {
        let controller = self.controller()?;
        let body = controller
            .expand(&id)
            .await?
            .with_context(|| format!("Body of {id} is not available"))?;
        println!("{body}");
        Ok(())
    }

    async fn add(&self, mut draft: EntryDraft) -> Result<()> {
        let controller = self.controller()?;
        controller.add_entry(&mut draft).await?;

        if let Some(notice) = controller.notice() {
            println!("{}", notice.text);
        }
        if let Some(first) = controller.snapshot().entries().first() {
            println!("{}", render_entry(first));
        }
        Ok(())
    }

    async fn delete(&self, id: EntryId) -> Result<()> {
        let controller = self.controller()?;
        controller.delete_entry(&id).await?;
        println!("Deleted {id}.");
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        let mut state = session_store::load_access_state(&self.session_dir)?;
        state.sign_out();
        session_store::save_access_state(&self.session_dir, &state)?;
        session_store::clear_store_credentials(&self.session_dir)?;
        println!("Locked.");
        Ok(())
    }
}

fn config_path() -> Result<()> {
    let path = DiaryConfig::config_path()?;
    if DiaryConfig::write_default_if_missing(&path)? {
        eprintln!("Created default config");
    }
    println!("{}", path.display());
    Ok(())
}

fn locked_message(until: OffsetDateTime) -> String {
    let now = SystemClock.now();
    let minutes = ((until - now).whole_seconds().max(0) + 59) / 60;
    format!(
        "Too many wrong passwords. Locked until {} ({} min left).",
        format_display_time(until),
        minutes
    )
}

fn render_entry(entry: &EntryPreview) -> String {
    let ellipsis = if entry.has_more { "..." } else { "" };
    format!(
        "[{}] {}  {}\n    {}{}",
        entry.id,
        entry.created_at_display(),
        entry.title,
        entry.preview.replace('\n', "\n    "),
        ellipsis
    )
}
