mod panel;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use self::panel::{CharacteristicsPanel, PanelState, ScopeTicket};
use crate::error::{ResolutionError, Result};

/// Characteristic type name mapped to its allowed values, in display order.
pub type CharacteristicMap = BTreeMap<String, Vec<String>>;

/// Narrows which characteristics apply. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_id: Option<i64>,
}

impl CharacteristicScope {
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn with_subcategory(mut self, subcategory_id: i64) -> Self {
        self.subcategory_id = Some(subcategory_id);
        self
    }
}

/// The three backend routes characteristics can be fetched from.
#[async_trait]
pub trait CharacteristicSource: Send + Sync {
    async fn custom_characteristics(&self, scope: &CharacteristicScope)
        -> Result<CharacteristicMap>;

    /// Same request as [`custom_characteristics`](Self::custom_characteristics)
    /// against the trailing-slash route.
    async fn custom_characteristics_alternate(
        &self,
        scope: &CharacteristicScope,
    ) -> Result<CharacteristicMap>;

    async fn subcategory_characteristics(&self, subcategory_id: i64)
        -> Result<CharacteristicMap>;
}

/// Resolves the characteristics of `scope`, trying each route in turn.
///
/// Calls are sequential with a single attempt each. When everything fails
/// the alternate-route error is reported; the subcategory lookup only runs
/// when the scope names a subcategory and its error is kept as a secondary
/// diagnostic. An empty map is a valid answer.
pub async fn resolve<S>(
    source: &S,
    scope: &CharacteristicScope,
) -> Result<CharacteristicMap, ResolutionError>
where
    S: CharacteristicSource + ?Sized,
{
    match source.custom_characteristics(scope).await {
        Ok(map) => return Ok(map),
        Err(error) => warn!("Characteristics lookup failed, trying alternate route. {error}"),
    }

    let cause = match source.custom_characteristics_alternate(scope).await {
        Ok(map) => return Ok(map),
        Err(error) => {
            warn!("Alternate characteristics route failed. {error}");
            error
        }
    };

    let Some(subcategory_id) = scope.subcategory_id else {
        return Err(ResolutionError::new(cause, None));
    };

    info!("Falling back to characteristics of subcategory {subcategory_id}");
    match source.subcategory_characteristics(subcategory_id).await {
        Ok(map) => Ok(map),
        Err(error) => {
            warn!("Subcategory characteristics lookup failed. {error}");
            Err(ResolutionError::new(cause, Some(error)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::StatusCode;

    use super::*;
    use crate::error::Error;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Route {
        Custom,
        Alternate,
        Subcategory,
    }

    /// Answers each route with a fixed outcome and records the calls made.
    #[derive(Default)]
    struct ScriptedSource {
        custom: Option<CharacteristicMap>,
        alternate: Option<CharacteristicMap>,
        subcategory: Option<CharacteristicMap>,
        calls: Mutex<Vec<Route>>,
    }

    impl ScriptedSource {
        fn answer(
            &self,
            route: Route,
            outcome: Option<&CharacteristicMap>,
        ) -> Result<CharacteristicMap> {
            self.calls.lock().unwrap().push(route);
            outcome.cloned().ok_or_else(|| {
                let body = format!("{route:?} failed");
                Error::transport(StatusCode::NOT_FOUND, &body)
            })
        }

        fn calls(&self) -> Vec<Route> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CharacteristicSource for ScriptedSource {
        async fn custom_characteristics(
            &self,
            _scope: &CharacteristicScope,
        ) -> Result<CharacteristicMap> {
            self.answer(Route::Custom, self.custom.as_ref())
        }

        async fn custom_characteristics_alternate(
            &self,
            _scope: &CharacteristicScope,
        ) -> Result<CharacteristicMap> {
            self.answer(Route::Alternate, self.alternate.as_ref())
        }

        async fn subcategory_characteristics(
            &self,
            _subcategory_id: i64,
        ) -> Result<CharacteristicMap> {
            self.answer(Route::Subcategory, self.subcategory.as_ref())
        }
    }

    fn colors() -> CharacteristicMap {
        BTreeMap::from([(
            "Color".to_string(),
            vec!["Red".to_string(), "Blue".to_string()],
        )])
    }

    #[tokio::test]
    async fn primary_success_makes_one_call() {
        let source = ScriptedSource {
            custom: Some(colors()),
            alternate: Some(CharacteristicMap::new()),
            ..Default::default()
        };
        let scope = CharacteristicScope::default().with_subcategory(3);

        assert_eq!(resolve(&source, &scope).await.unwrap(), colors());
        assert_eq!(source.calls(), vec![Route::Custom]);
    }

    #[tokio::test]
    async fn alternate_route_used_after_primary_fails() {
        let source = ScriptedSource {
            alternate: Some(colors()),
            ..Default::default()
        };
        let scope = CharacteristicScope::default().with_name("lamp");

        assert_eq!(resolve(&source, &scope).await.unwrap(), colors());
        assert_eq!(source.calls(), vec![Route::Custom, Route::Alternate]);
    }

    #[tokio::test]
    async fn no_subcategory_reports_alternate_error() {
        let source = ScriptedSource {
            subcategory: Some(colors()),
            ..Default::default()
        };
        let scope = CharacteristicScope::default().with_category(2);

        let err = resolve(&source, &scope).await.unwrap_err();
        assert_eq!(err.cause().to_string(), "Alternate failed");
        assert!(err.subcategory_attempt().is_none());
        assert_eq!(source.calls(), vec![Route::Custom, Route::Alternate]);
    }

    #[tokio::test]
    async fn subcategory_fallback_succeeds() {
        let source = ScriptedSource {
            subcategory: Some(colors()),
            ..Default::default()
        };
        let scope = CharacteristicScope::default().with_subcategory(7);

        assert_eq!(resolve(&source, &scope).await.unwrap(), colors());
        assert_eq!(
            source.calls(),
            vec![Route::Custom, Route::Alternate, Route::Subcategory]
        );
    }

    #[tokio::test]
    async fn exhausted_chain_reports_alternate_error() {
        let source = ScriptedSource::default();
        let scope = CharacteristicScope::default()
            .with_name("lamp")
            .with_subcategory(7);

        let err = resolve(&source, &scope).await.unwrap_err();
        assert_eq!(err.cause().to_string(), "Alternate failed");
        assert_eq!(
            err.subcategory_attempt().map(ToString::to_string),
            Some("Subcategory failed".to_string())
        );
        assert_eq!(
            source.calls(),
            vec![Route::Custom, Route::Alternate, Route::Subcategory]
        );
    }

    #[tokio::test]
    async fn empty_map_is_not_an_error() {
        let source = ScriptedSource {
            custom: Some(CharacteristicMap::new()),
            ..Default::default()
        };

        let map = resolve(&source, &CharacteristicScope::default()).await.unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn scope_body_omits_absent_fields() {
        let scope = CharacteristicScope::default()
            .with_name("lamp")
            .with_subcategory(4);
        assert_eq!(
            serde_json::to_string(&scope).unwrap(),
            r#"{"name":"lamp","subcategoryId":4}"#
        );
    }
}
