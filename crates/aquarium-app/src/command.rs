use aquarium_core::{Aquarium, DatasetView, PointerEvent, SceneSink, Viewport};
use crossfire::mpmc;
use crossfire::{MAsyncTx, MRx, TryRecvError, TrySendError, detect_backoff_cfg};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything that can change the scene outside of an animation tick.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A new dataset snapshot; `None` means the host has no data bound.
    Dataset(Option<DatasetView>),
    Resize(Option<Viewport>),
    Pointer(PointerEvent),
}

pub type EventSender = MAsyncTx<HostEvent>;
pub type EventReceiver = MRx<HostEvent>;
pub type EventDrain = Arc<dyn Fn(&mut Aquarium, &mut dyn SceneSink) -> usize + Send + Sync>;
pub type EventSubmit = Arc<dyn Fn(HostEvent) -> bool + Send + Sync>;

pub fn create_event_bus(capacity: usize) -> (EventSender, EventReceiver) {
    detect_backoff_cfg();
    mpmc::bounded_tx_async_rx_blocking(capacity)
}

/// Applies every queued event in arrival order; returns how many were applied.
pub fn drain_pending_events(
    receiver: &EventReceiver,
    aquarium: &mut Aquarium,
    sink: &mut dyn SceneSink,
) -> usize {
    let mut applied = 0;
    loop {
        match receiver.try_recv() {
            Ok(event) => {
                apply_event(aquarium, sink, event);
                applied += 1;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => break,
        }
    }
    applied
}

fn apply_event(aquarium: &mut Aquarium, sink: &mut dyn SceneSink, event: HostEvent) {
    match event {
        HostEvent::Dataset(view) => {
            let viewport = aquarium.viewport();
            let report = aquarium.update(view.as_ref(), viewport, sink);
            debug!(
                created = report.created,
                updated = report.updated,
                retired = report.retired.len(),
                emptied = report.emptied,
                "applied dataset event"
            );
        }
        HostEvent::Resize(viewport) => {
            debug!(?viewport, "applied resize event");
            aquarium.resize(viewport, sink);
        }
        HostEvent::Pointer(pointer) => {
            let change = aquarium.pointer(pointer, sink);
            debug!(?pointer, ?change, "applied pointer event");
        }
    }
}

pub fn make_event_drain(receiver: EventReceiver) -> EventDrain {
    let receiver = Arc::new(receiver);
    Arc::new(move |aquarium: &mut Aquarium, sink: &mut dyn SceneSink| {
        drain_pending_events(&receiver, aquarium, sink)
    })
}

pub fn make_event_submit(sender: EventSender) -> EventSubmit {
    let sender = Arc::new(sender);
    Arc::new(move |event: HostEvent| match sender.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            warn!(?event, "host event queue full; dropping event");
            false
        }
        Err(TrySendError::Disconnected(event)) => {
            warn!(?event, "host event queue disconnected");
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquarium_core::{AquariumConfig, FishId, HostServices, SeriesColumn};
    use aquarium_render::{AsciiSurface, VisualAdapter};

    fn aquarium() -> Aquarium {
        let config = AquariumConfig {
            rng_seed: Some(3),
            ..AquariumConfig::default()
        };
        Aquarium::new(config, HostServices::default()).expect("aquarium")
    }

    fn view(values: Vec<Option<f64>>) -> DatasetView {
        DatasetView::from_columns(
            (0..values.len()).map(|row| format!("row{row}")).collect(),
            vec![SeriesColumn::new(values)],
        )
    }

    #[test]
    fn events_apply_in_submission_order() {
        let (tx, rx) = create_event_bus(8);
        let submit = make_event_submit(tx);
        let drain = make_event_drain(rx);
        let mut aquarium = aquarium();
        let mut adapter = VisualAdapter::new(AsciiSurface::new(40, 20).expect("surface"));

        assert!(submit(HostEvent::Resize(Some(Viewport::new(40.0, 40.0)))));
        assert!(submit(HostEvent::Dataset(Some(view(vec![Some(1.0), Some(2.0)])))));
        assert!(submit(HostEvent::Dataset(Some(view(vec![Some(1.0), None])))));
        assert_eq!(drain(&mut aquarium, &mut adapter), 3);
        assert_eq!(aquarium.registry().len(), 1);
        assert_eq!(adapter.handle_count(), 1);
        assert_eq!(aquarium.viewport(), Some(Viewport::new(40.0, 40.0)));
        assert_eq!(drain(&mut aquarium, &mut adapter), 0);
    }

    #[test]
    fn pointer_events_route_to_selection() {
        let (tx, rx) = create_event_bus(8);
        let submit = make_event_submit(tx);
        let mut aquarium = aquarium();
        let mut adapter = VisualAdapter::new(AsciiSurface::new(40, 20).expect("surface"));
        aquarium.update(
            Some(&view(vec![Some(5.0)])),
            Some(Viewport::new(40.0, 40.0)),
            &mut adapter,
        );
        let id: FishId = aquarium.registry().iter().map(|(id, _)| id).next().expect("fish");

        submit(HostEvent::Pointer(PointerEvent::Click(Some(id))));
        drain_pending_events(&rx, &mut aquarium, &mut adapter);
        assert_eq!(aquarium.selection().selected(), Some(id));

        submit(HostEvent::Pointer(PointerEvent::Click(None)));
        drain_pending_events(&rx, &mut aquarium, &mut adapter);
        assert_eq!(aquarium.selection().selected(), None);
    }

    #[test]
    fn full_queue_rejects_events() {
        let (tx, _rx) = create_event_bus(1);
        let submit = make_event_submit(tx);
        assert!(submit(HostEvent::Resize(None)));
        assert!(!submit(HostEvent::Resize(None)));
    }
}
