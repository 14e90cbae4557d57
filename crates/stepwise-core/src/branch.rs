use std::fmt;

use serde::{Deserialize, Serialize};

use crate::progress::StoreKeys;
use crate::store::{SessionStore, StoreError, read_decoded, write_encoded};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchState {
    Unset,
    Selected,
    Skipped,
}

impl fmt::Display for BranchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Selected => write!(f, "selected"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BranchEntry {
    name: String,
    state: BranchState,
}

// Entries stay in the order they were last set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchStates {
    entries: Vec<BranchEntry>,
}

impl BranchStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_of(&self, name: &str) -> BranchState {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.state)
            .unwrap_or(BranchState::Unset)
    }

    pub fn selection_rank(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name == name && entry.state == BranchState::Selected)
    }

    pub fn select(&mut self, name: &str) {
        self.set(name, BranchState::Selected);
    }

    pub fn skip(&mut self, name: &str) {
        self.set(name, BranchState::Skipped);
    }

    pub fn clear(&mut self, name: &str) {
        self.entries.retain(|entry| entry.name != name);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, BranchState)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.state))
    }

    fn set(&mut self, name: &str, state: BranchState) {
        self.clear(name);
        if state != BranchState::Unset {
            self.entries.push(BranchEntry {
                name: name.to_string(),
                state,
            });
        }
    }
}

pub struct BranchSelector<'a> {
    store: &'a dyn SessionStore,
    keys: &'a StoreKeys,
}

impl<'a> BranchSelector<'a> {
    pub fn new(store: &'a dyn SessionStore, keys: &'a StoreKeys) -> Self {
        Self { store, keys }
    }

    pub fn states(&self) -> Result<BranchStates, StoreError> {
        Ok(read_decoded(self.store, self.keys.branches())?.unwrap_or_default())
    }

    pub fn state_of(&self, name: &str) -> Result<BranchState, StoreError> {
        Ok(self.states()?.state_of(name))
    }

    pub fn select(&self, name: &str) -> Result<(), StoreError> {
        self.update(|states| states.select(name))
    }

    pub fn skip(&self, name: &str) -> Result<(), StoreError> {
        self.update(|states| states.skip(name))
    }

    pub fn clear(&self, name: &str) -> Result<(), StoreError> {
        self.update(|states| states.clear(name))
    }

    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.store.delete(self.keys.branches())
    }

    fn update(&self, change: impl FnOnce(&mut BranchStates)) -> Result<(), StoreError> {
        let mut states = self.states()?;
        change(&mut states);

        if states.is_empty() {
            return self.store.delete(self.keys.branches());
        }

        write_encoded(self.store, self.keys.branches(), &states)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;

    use super::*;

    #[test]
    fn states_default_to_unset() {
        let states = BranchStates::new();
        assert_eq!(states.state_of("degree"), BranchState::Unset);
        assert_eq!(states.selection_rank("degree"), None);
    }

    #[test]
    fn only_one_state_holds_per_name() {
        let mut states = BranchStates::new();
        states.skip("degree");
        states.select("degree");

        assert_eq!(states.state_of("degree"), BranchState::Selected);
        assert_eq!(states.iter().count(), 1);
    }

    #[test]
    fn reselecting_moves_branch_to_most_recent() {
        let mut states = BranchStates::new();
        states.select("x");
        states.select("y");
        assert!(states.selection_rank("y") > states.selection_rank("x"));

        states.select("x");
        assert!(states.selection_rank("x") > states.selection_rank("y"));
    }

    #[test]
    fn selector_persists_each_mutation() {
        let store = MemoryStore::new();
        let keys = StoreKeys::new("signup");
        let selector = BranchSelector::new(&store, &keys);

        selector.select("business").expect("select");
        assert_eq!(
            BranchSelector::new(&store, &keys)
                .state_of("business")
                .expect("state"),
            BranchState::Selected
        );

        selector.skip("personal").expect("skip");
        assert_eq!(selector.state_of("personal").expect("state"), BranchState::Skipped);

        selector.clear("business").expect("clear");
        selector.clear("personal").expect("clear");
        assert!(store.is_empty());
    }

    #[test]
    fn selector_is_scoped_per_instance() {
        let store = MemoryStore::new();
        let signup = StoreKeys::new("signup");
        let checkout = StoreKeys::new("checkout");

        BranchSelector::new(&store, &signup)
            .select("business")
            .expect("select");

        assert_eq!(
            BranchSelector::new(&store, &checkout)
                .state_of("business")
                .expect("state"),
            BranchState::Unset
        );
    }
}
