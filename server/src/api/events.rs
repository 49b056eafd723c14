//! Live tree updates over Server-Sent Events
//!
//! Sends the caller's current tree as a `todos` event on connect and again
//! after every mutation to it, until the client disconnects or the server
//! shuts down.

use super::auth::AuthenticatedUser;
use crate::app::AppState;
use crate::error::Result;
use rocket::response::stream::{Event, EventStream};
use rocket::tokio::select;
use rocket::{get, Shutdown, State};

#[get("/events")]
pub async fn tree_events(
    user: AuthenticatedUser,
    state: &State<AppState>,
    mut shutdown: Shutdown,
) -> Result<EventStream![]> {
    let mut subscription = state.todos.subscribe(&user).await?;
    tracing::debug!("User {} subscribed to tree events", *user);

    Ok(EventStream! {
        yield Event::json(&*subscription.current).event("todos");

        loop {
            let snapshot = select! {
                next = subscription.next() => match next {
                    Some(snapshot) => snapshot,
                    None => break,
                },
                _ = &mut shutdown => break,
            };

            yield Event::json(&*snapshot).event("todos");
        }
    })
}
