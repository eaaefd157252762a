//! Request dispatcher.
//!
//! Maps an inbound `(method, path)` to a plant and offers it to the
//! [`ActivationQueue`].  It never blocks and never touches hardware: it
//! holds the queue, not the line registry.

use std::sync::Arc;

use axum::http::Method;
use log::{info, warn};

use crate::app::queue::{ActivationQueue, ActivationRequest};
use crate::config::{IrrigationConfig, PlantConfig};
use crate::drivers::registry::PlantId;

/// Body of the busy response.
pub const BUSY_MESSAGE: &str = "action already in progress";

/// Outcome of one dispatch, before HTTP rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The request was queued.
    Accepted { plant: String },
    /// Another activation is queued or executing.
    Busy { plant: String },
    /// Known path, wrong method.  Only POST is allowed.
    MethodNotAllowed,
    /// No plant is configured at this path.
    NotFound,
}

struct Route {
    id: PlantId,
    plant: PlantConfig,
}

/// Path → plant routing table in front of the queue.
pub struct Dispatcher {
    routes: Vec<Route>,
    queue: Arc<ActivationQueue>,
}

impl Dispatcher {
    pub fn new(config: &IrrigationConfig, queue: Arc<ActivationQueue>) -> Self {
        let routes = config
            .plants
            .iter()
            .enumerate()
            .map(|(index, plant)| Route {
                id: PlantId::new(index),
                plant: plant.clone(),
            })
            .collect();
        Self { routes, queue }
    }

    /// Exact match, first configured plant wins.
    fn route(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.plant.path == path)
    }

    pub fn dispatch(&self, method: &Method, path: &str) -> Dispatch {
        let Some(route) = self.route(path) else {
            return Dispatch::NotFound;
        };
        if *method != Method::POST {
            return Dispatch::MethodNotAllowed;
        }

        let plant = route.plant.name.clone();
        match self
            .queue
            .try_enqueue(ActivationRequest::new(route.id, &route.plant))
        {
            Ok(()) => {
                info!(
                    "dispatch: activating '{}' for {}s",
                    plant, route.plant.duration
                );
                Dispatch::Accepted { plant }
            }
            Err(_) => {
                warn!("dispatch: '{}' rejected, {}", plant, BUSY_MESSAGE);
                Dispatch::Busy { plant }
            }
        }
    }

    /// Configured paths, in routing order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.plant.path.as_str())
    }
}
