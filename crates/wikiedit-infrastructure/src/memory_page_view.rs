//! In-memory page surface for headless sessions.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use wikiedit_core::page_view::{PageChrome, PageView};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A form post recorded by [`MemoryPageView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub action_url: String,
    pub fields: BTreeMap<String, String>,
}

/// [`PageView`] that keeps everything in memory.
///
/// Confirmation prompts are answered from a script; once the script runs
/// out every prompt gets `default_answer`.
#[derive(Debug)]
pub struct MemoryPageView {
    chrome: Mutex<PageChrome>,
    scroll_top: Mutex<u32>,
    answers: Mutex<VecDeque<bool>>,
    default_answer: bool,
    prompts: Mutex<Vec<String>>,
    alerts: Mutex<Vec<String>>,
    toasts: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
    submissions: Mutex<Vec<Submission>>,
    unload_warning: Mutex<Option<String>>,
}

impl MemoryPageView {
    pub fn new(chrome: PageChrome) -> Self {
        Self {
            chrome: Mutex::new(chrome),
            scroll_top: Mutex::new(0),
            answers: Mutex::new(VecDeque::new()),
            default_answer: true,
            prompts: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            toasts: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            unload_warning: Mutex::new(None),
        }
    }

    /// Answer given once scripted answers are exhausted.
    pub fn with_default_answer(mut self, answer: bool) -> Self {
        self.default_answer = answer;
        self
    }

    pub fn push_answer(&self, answer: bool) {
        lock(&self.answers).push_back(answer);
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        lock(&self.alerts).clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        lock(&self.toasts).clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        lock(&self.navigations).clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        lock(&self.submissions).clone()
    }

    pub fn unload_warning(&self) -> Option<String> {
        lock(&self.unload_warning).clone()
    }
}

impl Default for MemoryPageView {
    fn default() -> Self {
        Self::new(PageChrome::default())
    }
}

#[async_trait]
impl PageView for MemoryPageView {
    fn chrome(&self) -> PageChrome {
        lock(&self.chrome).clone()
    }

    fn set_chrome(&self, chrome: PageChrome) {
        *lock(&self.chrome) = chrome;
    }

    fn scroll_top(&self) -> u32 {
        *lock(&self.scroll_top)
    }

    fn set_scroll_top(&self, top: u32) {
        *lock(&self.scroll_top) = top;
    }

    fn set_unload_warning(&self, message: Option<String>) {
        *lock(&self.unload_warning) = message;
    }

    async fn confirm(&self, message: &str) -> bool {
        lock(&self.prompts).push(message.to_string());
        let answer = lock(&self.answers)
            .pop_front()
            .unwrap_or(self.default_answer);
        debug!(%message, answer, "Confirmation answered");
        answer
    }

    fn alert(&self, message: &str) {
        lock(&self.alerts).push(message.to_string());
    }

    fn toast(&self, message: &str) {
        lock(&self.toasts).push(message.to_string());
    }

    fn navigate(&self, url: &str) {
        lock(&self.navigations).push(url.to_string());
        lock(&self.chrome).url = url.to_string();
    }

    fn submit(&self, action_url: &str, fields: &BTreeMap<String, String>) {
        lock(&self.submissions).push(Submission {
            action_url: action_url.to_string(),
            fields: fields.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_answers_then_default() {
        let view = MemoryPageView::default().with_default_answer(false);
        view.push_answer(true);

        assert!(view.confirm("first?").await);
        assert!(!view.confirm("second?").await);
        assert_eq!(view.prompts(), vec!["first?", "second?"]);
    }

    #[test]
    fn test_navigate_updates_url() {
        let view = MemoryPageView::default();
        view.navigate("/wiki/Test");
        assert_eq!(view.chrome().url, "/wiki/Test");
        assert_eq!(view.navigations(), vec!["/wiki/Test"]);
    }
}
