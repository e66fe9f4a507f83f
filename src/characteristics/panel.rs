use tracing::{debug, warn};

use super::{resolve, CharacteristicMap, CharacteristicScope, CharacteristicSource};
use crate::error::ResolutionError;

/// Identifies one characteristics request. Only the latest ticket's result
/// is ever applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    Empty,
    Loading,
    Ready(CharacteristicMap),
    /// Resolution failed; the characteristics section is hidden while price
    /// and sort filtering keep working.
    Degraded,
}

/// Characteristics for the scope the user is currently looking at.
///
/// The resolved map is cached for the current scope only; requesting a
/// different scope forgets it.
#[derive(Debug)]
pub struct CharacteristicsPanel {
    generation: u64,
    scope: Option<CharacteristicScope>,
    state: PanelState,
}

impl Default for CharacteristicsPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacteristicsPanel {
    pub fn new() -> Self {
        Self {
            generation: 0,
            scope: None,
            state: PanelState::Empty,
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn scope(&self) -> Option<&CharacteristicScope> {
        self.scope.as_ref()
    }

    /// Whether there is anything to show in the characteristics section.
    pub fn is_visible(&self) -> bool {
        matches!(&self.state, PanelState::Ready(map) if !map.is_empty())
    }

    pub fn cached(&self, scope: &CharacteristicScope) -> Option<&CharacteristicMap> {
        match &self.state {
            PanelState::Ready(map) if self.scope.as_ref() == Some(scope) => Some(map),
            _ => None,
        }
    }

    /// Marks `scope` as the latest requested one. Results of any earlier
    /// ticket are discarded from now on.
    pub fn request(&mut self, scope: CharacteristicScope) -> ScopeTicket {
        self.generation += 1;
        self.scope = Some(scope);
        self.state = PanelState::Loading;
        ScopeTicket(self.generation)
    }

    /// Applies a resolution result if `ticket` is still the latest request.
    /// Returns whether it was applied.
    pub fn complete(
        &mut self,
        ticket: ScopeTicket,
        result: Result<CharacteristicMap, ResolutionError>,
    ) -> bool {
        if ticket.0 != self.generation {
            debug!(
                "Discarding characteristics of a stale scope (request {}, latest {})",
                ticket.0, self.generation
            );
            return false;
        }
        self.state = match result {
            Ok(map) => PanelState::Ready(map),
            Err(error) => {
                warn!("Hiding characteristics. {error}");
                PanelState::Degraded
            }
        };
        true
    }

    /// Resolves `scope` unless it is the scope already held.
    pub async fn load<S>(&mut self, source: &S, scope: CharacteristicScope) -> &PanelState
    where
        S: CharacteristicSource + ?Sized,
    {
        if self.cached(&scope).is_some() {
            return &self.state;
        }
        let ticket = self.request(scope.clone());
        let result = resolve(source, &scope).await;
        self.complete(ticket, result);
        &self.state
    }
}
