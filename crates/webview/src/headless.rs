//! Windowless backend with scripted pages
//!
//! Navigation and evaluation are queued and only reach the [`Page`] model
//! during `pump`, the way a real renderer completes them asynchronously.
//! Every call is also written to a [`Journal`] that tests can inspect after
//! the run loop has returned.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pane_config::SizeHint;
use pane_ipc::BridgeSender;

use crate::backend::{Backend, BackendContext};
use crate::WebviewError;

/// Something the simulated renderer is asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A document finished loading; init scripts ran first, in order
    Load {
        url: String,
        init_scripts: Vec<String>,
    },
    /// Script evaluated in the current document
    Eval { script: String },
}

/// Model of the hosted content; posts messages as the page script would
pub trait Page {
    fn handle(&mut self, event: PageEvent, bridge: &BridgeSender);
}

impl<F> Page for F
where
    F: FnMut(PageEvent, &BridgeSender),
{
    fn handle(&mut self, event: PageEvent, bridge: &BridgeSender) {
        self(event, bridge)
    }
}

/// Page that never sends anything
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankPage;

impl Page for BlankPage {
    fn handle(&mut self, _event: PageEvent, _bridge: &BridgeSender) {}
}

/// Recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Navigate(String),
    Eval(String),
    Init(String),
    Title(String),
    Size { width: u32, height: u32, hint: SizeHint },
}

/// Shared log of everything a headless backend was asked to do
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<Recorded>>>,
}

impl Journal {
    fn record(&self, entry: Recorded) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    pub fn entries(&self) -> Vec<Recorded> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Entries minus the setup the engine performs on creation
    pub fn user_entries(&self) -> Vec<Recorded> {
        self.entries()
            .into_iter()
            .filter(|entry| match entry {
                Recorded::Init(script) => script != pane_ipc::BRIDGE_SHIM,
                _ => true,
            })
            .collect()
    }
}

enum Work {
    Load(String),
    Eval(String),
}

/// Backend without a window or a script engine
pub struct HeadlessBackend {
    page: Box<dyn Page>,
    bridge: BridgeSender,
    init_scripts: Vec<String>,
    pending: VecDeque<Work>,
    journal: Journal,
}

impl HeadlessBackend {
    pub fn new(context: BackendContext, page: impl Page + 'static) -> Self {
        Self {
            page: Box::new(page),
            bridge: context.bridge,
            init_scripts: Vec::new(),
            pending: VecDeque::new(),
            journal: Journal::default(),
        }
    }

    /// Record into an existing journal instead of a private one
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl Backend for HeadlessBackend {
    fn navigate(&mut self, url: &str) -> Result<(), WebviewError> {
        self.journal.record(Recorded::Navigate(url.to_string()));
        // A new load supersedes evaluations aimed at the old document.
        self.pending.retain(|work| !matches!(work, Work::Eval(_)));
        self.pending.push_back(Work::Load(url.to_string()));
        Ok(())
    }

    fn eval(&mut self, script: &str) -> Result<(), WebviewError> {
        self.journal.record(Recorded::Eval(script.to_string()));
        self.pending.push_back(Work::Eval(script.to_string()));
        Ok(())
    }

    fn init(&mut self, script: &str) -> Result<(), WebviewError> {
        self.journal.record(Recorded::Init(script.to_string()));
        self.init_scripts.push(script.to_string());
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        self.journal.record(Recorded::Title(title.to_string()));
    }

    fn set_size(&mut self, width: u32, height: u32, hint: SizeHint) {
        self.journal.record(Recorded::Size { width, height, hint });
    }

    fn pump(&mut self) -> Result<bool, WebviewError> {
        let Some(work) = self.pending.pop_front() else {
            return Ok(false);
        };
        match work {
            Work::Load(url) => {
                tracing::debug!(%url, "headless page loaded");
                let init_scripts = self.init_scripts.clone();
                self.page
                    .handle(PageEvent::Load { url, init_scripts }, &self.bridge);
            }
            Work::Eval(script) => {
                self.page.handle(PageEvent::Eval { script }, &self.bridge);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WebviewHandle;

    fn context() -> (BackendContext, pane_ipc::BridgeReceiver) {
        let (bridge, inbox) = pane_ipc::bridge();
        (
            BackendContext {
                bridge,
                handle: WebviewHandle::new(),
            },
            inbox,
        )
    }

    #[test]
    fn test_work_reaches_page_only_when_pumped() {
        let (ctx, mut inbox) = context();
        let mut backend = HeadlessBackend::new(ctx, |event: PageEvent, bridge: &BridgeSender| {
            if let PageEvent::Eval { script } = event {
                bridge.post(script).unwrap();
            }
        });

        backend.eval("first").unwrap();
        assert!(inbox.try_recv().is_none());

        assert!(backend.pump().unwrap());
        assert_eq!(inbox.try_recv().unwrap().payload, "first");
        assert!(!backend.pump().unwrap());
    }

    #[test]
    fn test_load_sees_init_scripts_in_order() {
        let (ctx, mut inbox) = context();
        let mut backend = HeadlessBackend::new(ctx, |event: PageEvent, bridge: &BridgeSender| {
            if let PageEvent::Load { init_scripts, .. } = event {
                bridge.post(init_scripts.join("|")).unwrap();
            }
        });

        backend.init("a").unwrap();
        backend.init("b").unwrap();
        backend.navigate("data:text/html,").unwrap();
        backend.pump().unwrap();
        assert_eq!(inbox.try_recv().unwrap().payload, "a|b");
    }

    #[test]
    fn test_navigation_drops_stale_evals() {
        let (ctx, _inbox) = context();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut backend = HeadlessBackend::new(ctx, move |event: PageEvent, _: &BridgeSender| {
            let label = match event {
                PageEvent::Load { url, .. } => format!("load {url}"),
                PageEvent::Eval { script } => format!("eval {script}"),
            };
            sink.lock().unwrap().push(label);
        });

        backend.eval("stale").unwrap();
        backend.navigate("about:blank").unwrap();
        backend.eval("fresh").unwrap();
        while backend.pump().unwrap() {}

        assert_eq!(*seen.lock().unwrap(), vec!["load about:blank", "eval fresh"]);
        assert_eq!(
            backend.journal().entries(),
            vec![
                Recorded::Eval("stale".into()),
                Recorded::Navigate("about:blank".into()),
                Recorded::Eval("fresh".into()),
            ]
        );
    }
}
