//! Screen loaders against in-memory backends
//!
//! Table access goes through hand-written fakes; the auth API is a wiremock
//! server so the gate runs its real sign-in path.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use app_core::beaches::{Beach, BeachDirectory, BeachWithConditions, FeaturedConditions, OccupancyFilter};
use app_core::conditions::{BeachConditions, OccupancyBand, HOME_AIR_TEMPERATURE};
use app_core::favorites::{FavoriteBeach, FavoriteRow, FavoritesBackend, FavoritesService};
use app_core::profiles::{ProfileService, ProfileUpdate, ProfilesBackend, UserProfile};
use app_state::{ColorMode, GateState, MutationClient, PreferenceStore, QueryClient, SessionGate};
use app_ui::screens::{self, AuthForm, AuthSubmit, BeachesScreen, Notice, ViewContext, ViewState};
use async_trait::async_trait;
use i18n::{Locale, Translator};
use storage::CacheConfig;
use tokio::sync::Notify;
use supabase_client::rest::{ClientConfig, RestError};
use supabase_client::session::MemorySessionStorage;
use supabase_client::SupabaseClient;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_ID: &str = "6f1c2d3e-4b5a-4c7d-8e9f-0a1b2c3d4e5f";

fn user_id() -> Uuid {
    USER_ID.parse().unwrap()
}

fn beach(name: &str, location: &str, occupancy: f64, status: OccupancyBand) -> BeachWithConditions {
    BeachWithConditions {
        beach: Beach {
            id: Uuid::new_v4(),
            name: name.to_string(),
            location: location.to_string(),
            description: None,
            image_url: None,
            created_at: None,
        },
        beach_conditions: vec![BeachConditions {
            occupancy_level: Some(occupancy),
            occupancy_status: Some(status),
            water_quality_score: Some(82.0),
            ..Default::default()
        }],
    }
}

// =============================================================================
// Fakes
// =============================================================================

struct FakeDirectory {
    beaches: Vec<BeachWithConditions>,
    featured: Option<FeaturedConditions>,
    broken: bool,
}

#[async_trait]
impl BeachDirectory for FakeDirectory {
    async fn beaches_with_conditions(&self) -> Result<Vec<BeachWithConditions>, RestError> {
        if self.broken {
            return Err(RestError::new(503, "Unknown", "service unavailable"));
        }
        Ok(self.beaches.clone())
    }

    async fn featured_conditions(&self) -> Result<Option<FeaturedConditions>, RestError> {
        if self.broken {
            return Err(RestError::new(503, "Unknown", "service unavailable"));
        }
        Ok(self.featured.clone())
    }
}

struct FakeFavorites {
    beaches: Vec<BeachWithConditions>,
    rows: Mutex<HashSet<(Uuid, Uuid)>>,
    reads: AtomicUsize,
}

impl FakeFavorites {
    fn row_count(&self, user: Uuid, beach: Uuid) -> usize {
        self.rows.lock().unwrap().iter().filter(|r| **r == (user, beach)).count()
    }
}

#[async_trait]
impl FavoritesBackend for FakeFavorites {
    async fn favorite_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RestError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().iter().filter(|(u, _)| *u == user_id).map(|(_, b)| *b).collect())
    }

    async fn favorite_beaches(&self, user_id: Uuid) -> Result<Vec<FavoriteBeach>, RestError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let ids = self.favorite_ids(user_id).await?;
        Ok(ids
            .into_iter()
            .map(|beach_id| FavoriteBeach {
                beach_id,
                beaches: self.beaches.iter().find(|b| b.beach.id == beach_id).cloned(),
            })
            .collect())
    }

    async fn insert_favorite(&self, row: FavoriteRow) -> Result<(), RestError> {
        if !self.rows.lock().unwrap().insert((row.user_id, row.beach_id)) {
            return Err(RestError::new(409, "23505", "duplicate key value"));
        }
        Ok(())
    }

    async fn delete_favorite(&self, row: FavoriteRow) -> Result<(), RestError> {
        self.rows.lock().unwrap().remove(&(row.user_id, row.beach_id));
        Ok(())
    }
}

#[derive(Default)]
struct FakeProfiles {
    updates: Mutex<Vec<ProfileUpdate>>,
    hold_next: AtomicBool,
    release: Notify,
}

#[async_trait]
impl ProfilesBackend for FakeProfiles {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, RestError> {
        Ok(Some(UserProfile {
            id: user_id,
            username: None,
            preferred_language: Some("es".to_string()),
            preferred_theme: Some("light".to_string()),
            created_at: None,
            updated_at: None,
        }))
    }

    async fn count_favorites(&self, _: Uuid) -> Result<u64, RestError> {
        Ok(2)
    }

    async fn update_profile(&self, _: Uuid, update: ProfileUpdate) -> Result<(), RestError> {
        self.updates.lock().unwrap().push(update);
        if self.hold_next.swap(false, Ordering::SeqCst) {
            self.release.notified().await;
        }
        Ok(())
    }
}

struct Harness {
    ctx: ViewContext,
    favorites: Arc<FakeFavorites>,
    profiles: Arc<FakeProfiles>,
    beaches: Vec<BeachWithConditions>,
    server: MockServer,
}

async fn harness(broken: bool) -> Harness {
    let server = MockServer::start().await;
    let beaches = vec![
        beach("Playa de la Concha", "San Sebastián", 65.0, OccupancyBand::Moderate),
        beach("Cala Macarella", "Menorca", 12.0, OccupancyBand::Low),
        beach("Playa de Bolonia", "Tarifa", 88.0, OccupancyBand::High),
    ];

    let client = SupabaseClient::new(ClientConfig::new(server.uri(), "anon-key")).unwrap();
    let queries = QueryClient::new(CacheConfig::default());
    let mutations = MutationClient::new(queries.clone());
    let gate = SessionGate::new(client, Arc::new(MemorySessionStorage::new()), queries.clone());
    gate.restore().await;

    let favorites = Arc::new(FakeFavorites {
        beaches: beaches.clone(),
        rows: Mutex::new(HashSet::new()),
        reads: AtomicUsize::new(0),
    });
    let profiles = Arc::new(FakeProfiles::default());

    let ctx = ViewContext {
        gate,
        queries,
        directory: Arc::new(FakeDirectory { beaches: beaches.clone(), featured: None, broken }),
        favorites: FavoritesService::new(favorites.clone(), mutations.clone()),
        profiles: ProfileService::new(profiles.clone(), mutations),
        preferences: PreferenceStore::default(),
        translator: Arc::new(Translator::load().unwrap()),
    };

    Harness { ctx, favorites, profiles, beaches, server }
}

async fn sign_in(h: &Harness) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "user-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": {"id": USER_ID, "email": "marina@example.com"}
        })))
        .mount(&h.server)
        .await;

    let form = AuthForm {
        email: "marina@example.com".to_string(),
        password: "secret".to_string(),
        ..Default::default()
    };
    assert_eq!(form.submit(&h.ctx.gate).await, AuthSubmit::SignedIn);
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_signed_out_views_need_sign_in_without_fetching() {
    let h = harness(false).await;
    assert_eq!(h.ctx.gate.state(), GateState::Unauthenticated);

    assert_eq!(screens::favorites(&h.ctx).await, ViewState::SignInRequired);
    assert_eq!(screens::profile(&h.ctx).await, ViewState::SignInRequired);
    assert_eq!(h.favorites.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_home_falls_back_without_readings() {
    let h = harness(false).await;

    let view = screens::home(&h.ctx).await;
    let home = view.ready().unwrap();
    assert_eq!(home.beach_name, "Playa Principal");
    assert_eq!(home.location, "Ubicación");
    assert_eq!(home.conditions.readout.air_temperature, HOME_AIR_TEMPERATURE);
    assert_eq!(home.title, h.ctx.t("welcomeToSolymar"));
}

#[tokio::test]
async fn test_failed_reads_surface_as_failed() {
    let h = harness(true).await;

    assert!(matches!(screens::home(&h.ctx).await, ViewState::Failed(msg) if msg.contains("service unavailable")));
    assert!(matches!(BeachesScreen::default().load(&h.ctx).await, ViewState::Failed(_)));
}

#[tokio::test]
async fn test_rejected_sign_in_stays_unauthenticated() {
    let h = harness(false).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&h.server)
        .await;

    let form = AuthForm {
        email: "marina@example.com".to_string(),
        password: "wrong".to_string(),
        ..Default::default()
    };
    assert_eq!(form.submit(&h.ctx.gate).await, AuthSubmit::Rejected);
    assert_eq!(h.ctx.gate.state(), GateState::Unauthenticated);
    assert!(!h.ctx.gate.is_submitting());

    assert_eq!(AuthForm::default().submit(&h.ctx.gate).await, AuthSubmit::Incomplete);
}

#[tokio::test]
async fn test_beaches_search_filter_and_toggle() {
    let h = harness(false).await;
    sign_in(&h).await;

    let all = BeachesScreen::default().load(&h.ctx).await;
    let all = all.ready().unwrap();
    assert_eq!(all.rows.len(), 3);
    assert_eq!(all.filters.len(), 4);
    assert!(all.filters[0].selected);

    // Badge follows the reported status, the percentage color follows the band
    let concha = &all.rows[0];
    let card = concha.conditions.as_ref().unwrap();
    assert_eq!(card.status_badge.text.to_string(), "gold-700");
    assert_eq!(card.occupancy_color.text.to_string(), "coral-500");
    assert_eq!(card.readout.quality_stars, 4);

    let screen = BeachesScreen { search: "tarifa".to_string(), filter: OccupancyFilter::High };
    let filtered = screen.load(&h.ctx).await;
    assert_eq!(filtered.ready().unwrap().rows.len(), 1);

    let target = h.beaches[1].beach.id;
    let notice = screen.toggle_favorite(&h.ctx, target, false).await.unwrap();
    assert_eq!(notice, Notice::FAVORITES_UPDATED);

    let reloaded = BeachesScreen::default().load(&h.ctx).await;
    let row = reloaded.ready().unwrap().rows.iter().find(|r| r.id == target).unwrap().clone();
    assert!(row.is_favorite);
    assert!(!row.pending);

    screen.toggle_favorite(&h.ctx, target, true).await.unwrap();
    assert_eq!(h.favorites.row_count(user_id(), target), 0);
}

#[tokio::test]
async fn test_favorites_list_and_remove() {
    let h = harness(false).await;
    sign_in(&h).await;

    assert_eq!(screens::favorites(&h.ctx).await, ViewState::Empty);

    let target = h.beaches[0].beach.id;
    BeachesScreen::default().toggle_favorite(&h.ctx, target, false).await.unwrap();

    let view = screens::favorites(&h.ctx).await;
    let rows = &view.ready().unwrap().rows;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_favorite);

    assert_eq!(screens::remove_favorite(&h.ctx, target).await.unwrap(), Notice::FAVORITE_REMOVED);
    assert_eq!(screens::favorites(&h.ctx).await, ViewState::Empty);
}

#[tokio::test]
async fn test_explore_is_static() {
    let h = harness(true).await;

    let view = screens::explore(&h.ctx);
    let explore = view.ready().unwrap();
    assert_eq!(explore.tiles.len(), 6);
    assert_eq!(explore.tiles[0].gradient.from.to_string(), "gold-400");
}

#[tokio::test]
async fn test_preferences_apply_locally_and_save_when_signed_in() {
    let h = harness(false).await;

    assert_eq!(screens::change_language(&h.ctx, Locale::En).await.unwrap(), None);
    assert_eq!(h.ctx.preferences.locale(), Locale::En);
    assert!(h.profiles.updates.lock().unwrap().is_empty());

    sign_in(&h).await;

    let notice = screens::toggle_theme(&h.ctx).await.unwrap();
    assert_eq!(notice, Some(Notice::PREFERENCES_SAVED));
    assert_eq!(h.ctx.preferences.color_mode(), ColorMode::Dark);
    assert_eq!(*h.profiles.updates.lock().unwrap(), vec![ProfileUpdate::theme("dark")]);

    let view = screens::profile(&h.ctx).await;
    let profile = view.ready().unwrap();
    assert_eq!(profile.display_name, "marina");
    assert_eq!(profile.favorites_count, 2);
    assert!(profile.dark_mode);
    assert_eq!(profile.locale, Locale::En);
}

#[tokio::test]
async fn test_theme_toggle_saved_while_language_save_outstanding() {
    let h = harness(false).await;
    sign_in(&h).await;
    h.profiles.hold_next.store(true, Ordering::SeqCst);

    let (language, theme) = tokio::join!(screens::change_language(&h.ctx, Locale::De), async {
        let theme = screens::toggle_theme(&h.ctx).await;
        h.profiles.release.notify_one();
        theme
    });

    assert_eq!(language.unwrap(), Some(Notice::PREFERENCES_SAVED));
    assert_eq!(theme.unwrap(), Some(Notice::PREFERENCES_SAVED));
    assert_eq!(h.ctx.preferences.color_mode(), ColorMode::Dark);
    assert_eq!(
        *h.profiles.updates.lock().unwrap(),
        vec![ProfileUpdate::language("de"), ProfileUpdate::theme("dark")]
    );
}
