//! One-time seeding of caseworker accounts at process start.

use fraudesk_core::{account::NewManager, store::DeskStore};

/// Insert every configured caseworker that is not already present. Safe to
/// run on every start; returns how many accounts were created.
pub async fn seed_caseworkers<S: DeskStore>(
  store: &S,
  caseworkers: &[NewManager],
) -> Result<usize, S::Error> {
  let mut created = 0;
  for seed in caseworkers {
    if store.ensure_manager(seed.clone()).await? {
      tracing::info!(rut = %seed.rut, "seeded caseworker");
      created += 1;
    } else {
      tracing::debug!(rut = %seed.rut, "caseworker already present");
    }
  }
  Ok(created)
}
