//! Display worker driven against a scripted link

use cfontz_display::{CfontzDisplay, DisplaySettings, Driver, Key};
use cfontz_driver::worker::{DisplayWorker, WorkerError};
use cfontz_transport::protocol::{key, tag};
use cfontz_transport::{cmd, Packet, ResponseMode, ScriptedHandle, ScriptedLink, Transport};
use std::sync::Arc;
use std::time::Duration;

const REFRESH: Duration = Duration::from_millis(20);

fn display_with(mode: ResponseMode) -> (CfontzDisplay<ScriptedLink>, ScriptedHandle) {
    let link = ScriptedLink::auto_ack();
    let handle = link.handle();
    let settings = DisplaySettings::for_model(633).unwrap();
    let display = CfontzDisplay::new(Transport::with_mode(link, mode), settings).unwrap();
    (display, handle)
}

#[tokio::test]
async fn call_runs_on_worker_and_returns_result() {
    let (display, _handle) = display_with(ResponseMode::default());
    let worker = DisplayWorker::spawn(display, REFRESH).unwrap();

    let size = worker.call(|d| (d.width(), d.height())).await.unwrap();
    assert_eq!(size, (16, 2));

    let name = worker
        .call(|_| std::thread::current().name().map(str::to_string))
        .await
        .unwrap();
    assert_eq!(name.as_deref(), Some("cfontz-worker"));

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn refresh_flushes_drawing() {
    let (display, handle) = display_with(ResponseMode::default());
    let worker = DisplayWorker::spawn(display, REFRESH).unwrap();

    worker.call(|d| d.string(3, 2, "Hi")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let packets = handle.written_packets();
    let update = packets
        .iter()
        .find(|p| p.command == cmd::SEND_DATA)
        .expect("row update sent");
    assert_eq!(update.payload(), &[2, 1, b'H', b'i']);
    assert!(worker.status().ticks > 0);

    let display = worker.shutdown().await.unwrap();
    assert_eq!(display.framebuffer().dirty_span(1), None);
}

#[tokio::test]
async fn keys_are_broadcast() {
    let (display, handle) = display_with(ResponseMode::default());
    let worker = DisplayWorker::spawn(display, REFRESH).unwrap();
    let mut keys = worker.subscribe_keys();

    handle.inject(&Packet::new(tag::KEY_ACTIVITY, &[key::UP_PRESS]).encode());
    handle.inject(&Packet::new(tag::KEY_ACTIVITY, &[key::UP_RELEASE]).encode());
    handle.inject(&Packet::new(tag::KEY_ACTIVITY, &[key::EXIT_PRESS]).encode());

    let first = tokio::time::timeout(Duration::from_secs(2), keys.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(2), keys.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!((first, second), (Key::Up, Key::Escape));
    assert_eq!(worker.status().keys, 2);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn flush_errors_are_counted_not_fatal() {
    let (display, handle) = display_with(ResponseMode::from_config(10, 250));
    handle.set_auto_ack(false);
    let worker = DisplayWorker::spawn(display, REFRESH).unwrap();

    worker.call(|d| d.string(1, 1, "lost")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = worker.status();
    assert!(status.flush_errors > 0);
    assert!(status.last_error.unwrap().contains("No response"));

    // still serving requests
    let contrast = worker.call(|d| d.get_contrast()).await.unwrap();
    assert_eq!(contrast, 560);

    handle.set_auto_ack(true);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let display = worker.shutdown().await.unwrap();
    assert_eq!(display.framebuffer().dirty_span(0), None);
}

#[tokio::test]
async fn call_after_worker_panic_reports_stopped() {
    let (display, _handle) = display_with(ResponseMode::default());
    let worker = DisplayWorker::spawn(display, REFRESH).unwrap();

    let result = worker.call::<(), _>(|_| panic!("boom")).await;
    assert!(matches!(result, Err(WorkerError::Stopped)));
    assert!(matches!(worker.shutdown().await, Err(WorkerError::Panicked)));
}

#[tokio::test]
async fn calls_beyond_queue_capacity_all_complete() {
    let (display, _handle) = display_with(ResponseMode::default());
    let worker = Arc::new(DisplayWorker::spawn(display, REFRESH).unwrap());

    // hold the worker busy so the queue fills up behind it
    let busy = {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move {
            worker
                .call(|_| std::thread::sleep(Duration::from_millis(100)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let tasks: Vec<_> = (0..100u32)
        .map(|i| {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move { worker.call(move |_| i * 2).await })
        })
        .collect();
    let mut total = 0;
    for task in tasks {
        total += task.await.unwrap().unwrap();
    }
    busy.await.unwrap().unwrap();
    assert_eq!(total, (0..100u32).map(|i| i * 2).sum::<u32>());

    let worker = Arc::try_unwrap(worker).ok().expect("no other owners");
    worker.shutdown().await.unwrap();
}
