use anyhow::Context;
use dashboard_core::{AddOutcome, Dashboard, TrackedCity};
use inquire::{InquireError, Select, Text};
use std::{fmt, time::Duration};

use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Show,
    Add,
    Remove,
    RefreshAll,
    DismissError,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Show => "Show dashboard",
            Action::Add => "Add city",
            Action::Remove => "Remove city",
            Action::RefreshAll => "Refresh all",
            Action::DismissError => "Dismiss error",
            Action::Quit => "Quit",
        })
    }
}

/// Entries for the menu. Removal is only offered while more than one city is
/// tracked, and dismissal only while an error is shown.
fn menu(city_count: usize, has_error: bool) -> Vec<Action> {
    let mut actions = vec![Action::Show, Action::Add];
    if city_count > 1 {
        actions.push(Action::Remove);
    }
    actions.push(Action::RefreshAll);
    if has_error {
        actions.push(Action::DismissError);
    }
    actions.push(Action::Quit);
    actions
}

struct CityChoice(TrackedCity);

impl fmt::Display for CityChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.country_code {
            Some(cc) => write!(f, "{} ({cc})", self.0.name),
            None => f.write_str(&self.0.name),
        }
    }
}

/// Runs a blocking prompt off the async runtime. `None` means the user
/// cancelled (Esc / Ctrl-C).
async fn prompt<T, F>(f: F) -> anyhow::Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await.context("Prompt task failed")? {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Interactive dashboard: initial load, periodic refresh in the background,
/// and a menu loop until the user quits.
pub async fn run(dashboard: Dashboard, interval: Duration) -> anyhow::Result<()> {
    if dashboard.is_offline() {
        println!("Offline mode: all readings are mock data.\n");
    }

    dashboard.refresh_all().await;
    let auto_refresh = dashboard.spawn_auto_refresh(interval);
    tracing::info!(interval_secs = interval.as_secs(), "auto-refresh started");

    print!("{}", render::dashboard(&dashboard.snapshot()));

    loop {
        let snapshot = dashboard.snapshot();
        let options = menu(snapshot.cities.len(), snapshot.error.is_some());

        let action = prompt(move || Select::new("What next?", options).prompt())
            .await?
            .unwrap_or(Action::Quit);

        match action {
            Action::Show => {}
            Action::Add => {
                let Some(query) = prompt(|| Text::new("City:").prompt()).await? else {
                    continue;
                };
                match dashboard.add_city(&query).await {
                    Ok(AddOutcome::Added(_)) => {}
                    Ok(AddOutcome::AlreadyTracked(_)) => {
                        println!("{} is already on the dashboard.", query.trim());
                    }
                    Err(err) => tracing::debug!(error = %err, "add city failed"),
                }
            }
            Action::Remove => {
                let choices: Vec<CityChoice> =
                    snapshot.cities.into_iter().map(CityChoice).collect();
                if let Some(CityChoice(city)) =
                    prompt(move || Select::new("Remove which city?", choices).prompt()).await?
                {
                    dashboard.remove_city(&city.id);
                }
            }
            Action::RefreshAll => {
                dashboard.refresh_all().await;
            }
            Action::DismissError => dashboard.clear_error(),
            Action::Quit => break,
        }

        print!("{}", render::dashboard(&dashboard.snapshot()));
    }

    auto_refresh.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_hidden_for_single_city() {
        assert!(!menu(1, false).contains(&Action::Remove));
        assert!(menu(2, false).contains(&Action::Remove));
    }

    #[test]
    fn dismiss_only_with_error() {
        assert!(!menu(3, false).contains(&Action::DismissError));
        assert!(menu(3, true).contains(&Action::DismissError));
        assert_eq!(menu(0, true).last(), Some(&Action::Quit));
    }
}
