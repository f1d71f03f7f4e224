use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::client::ContextManager;
use crate::client::contracts::WorldCoords;
use crate::core::BrainLocation;
use crate::error::{ViewerError, ViewerResult};
use crate::events::{Channel, Event, EventBus, Subscriptions};

/// What the coordinate readout currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateReadout {
    pub location: Option<BrainLocation>,
    pub world: Option<WorldCoords>,
    pub time_point: Option<usize>,
}

struct DisplayShared {
    readout: RefCell<CoordinateReadout>,
    client: Rc<ContextManager>,
}

impl DisplayShared {
    fn on_location_changed(&self, event: &Event) -> ViewerResult<()> {
        let location = location_from_event(event)?;
        let world = self.client.data().get_world_coords(location)?;
        let mut readout = self.readout.borrow_mut();
        readout.location = Some(location);
        readout.world = Some(world);
        Ok(())
    }

    fn on_context_changed(&self) -> ViewerResult<()> {
        let time_point = self.client.data().get_timepoint()?;
        *self.readout.borrow_mut() = CoordinateReadout {
            time_point: Some(time_point),
            ..CoordinateReadout::default()
        };
        Ok(())
    }
}

/// Keeps the voxel/vertex and world coordinate readout in step with the
/// selected location and time slider.
pub struct CoordinateDisplayCoordinator {
    shared: Rc<DisplayShared>,
    subscriptions: Subscriptions,
}

impl CoordinateDisplayCoordinator {
    #[must_use]
    pub fn new(client: Rc<ContextManager>, bus: EventBus) -> Self {
        let shared = Rc::new(DisplayShared {
            readout: RefCell::new(CoordinateReadout::default()),
            client,
        });
        let mut subscriptions = Subscriptions::new(bus.clone());

        let weak = Rc::downgrade(&shared);
        subscriptions.push(bus.subscribe(Channel::LocationChanged, move |event| {
            upgrade(&weak).map_or(Ok(()), |shared| shared.on_location_changed(event))
        }));

        let weak = Rc::downgrade(&shared);
        subscriptions.push(bus.subscribe(Channel::TimeSliderChanged, move |event| {
            let Some(shared) = upgrade(&weak) else {
                return Ok(());
            };
            let time_point = event.usize_field("time_point").ok_or_else(|| {
                ViewerError::InvalidData("time slider event without `time_point`".to_owned())
            })?;
            shared.readout.borrow_mut().time_point = Some(time_point);
            Ok(())
        }));

        let weak = Rc::downgrade(&shared);
        subscriptions.push(bus.subscribe(Channel::ContextChanged, move |_event| {
            upgrade(&weak).map_or(Ok(()), |shared| shared.on_context_changed())
        }));

        Self {
            shared,
            subscriptions,
        }
    }

    #[must_use]
    pub fn readout(&self) -> CoordinateReadout {
        self.shared.readout.borrow().clone()
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn teardown(&mut self) -> usize {
        self.subscriptions.release_all()
    }
}

fn upgrade(weak: &Weak<DisplayShared>) -> Option<Rc<DisplayShared>> {
    weak.upgrade()
}

pub(crate) fn location_from_event(event: &Event) -> ViewerResult<BrainLocation> {
    let location = event.payload.get("location").cloned().ok_or_else(|| {
        ViewerError::InvalidData(format!("`{}` event without `location`", event.channel))
    })?;
    serde_json::from_value(location).map_err(|e| {
        ViewerError::InvalidData(format!("`{}` event has invalid `location`: {e}", event.channel))
    })
}
