mod common;

use std::time::{Duration, Instant};

use common::{
    OPTION_PREVIEW, OPTION_TERMINATED, QueueSource, SharedSink, sacn_packet, sacn_packet_with,
};
use sacnrx_core::decode::{ChannelType, Color, GammaTable, WhiteChannels};
use sacnrx_core::protocols::sacn::RejectKind;
use sacnrx_core::{
    FallbackPolicy, Listener, ListenerOptions, ReceiverConfig, ReceiverState, RouterOptions,
};

fn listener() -> Listener<QueueSource> {
    Listener::new(QueueSource::default(), ListenerOptions::default())
}

#[test]
fn rgb_fixture_follows_the_stream_and_restores_on_timeout() {
    let mut listener = listener();
    let external = Color::rgb(0.1, 0.2, 0.3);
    let (sink, log) = SharedSink::fixture(WhiteChannels::None, external);
    let handle = listener
        .create_receiver(
            ReceiverConfig {
                universe: 1,
                start_channel: 1,
                ..ReceiverConfig::default()
            },
            sink,
        )
        .unwrap();
    assert_eq!(log.borrow().color, Some(Color::BLACK));

    let t0 = Instant::now();
    listener.source_mut().push(sacn_packet(1, &[255, 0, 0]));
    let summary = listener.tick_at(t0).unwrap();
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.delivered, 1);
    assert_eq!(log.borrow().color, Some(Color::rgb(1.0, 0.0, 0.0)));
    assert_eq!(log.borrow().brightness, Some(1.0));

    listener.tick_at(t0 + Duration::from_millis(2500)).unwrap();
    assert!(log.borrow().restored.is_empty());

    let summary = listener.tick_at(t0 + Duration::from_millis(2600)).unwrap();
    assert_eq!(summary.timeouts, 1);
    assert_eq!(log.borrow().restored, vec![external]);
    assert_eq!(
        listener.receiver(handle).map(|r| r.state()),
        Some(ReceiverState::TimedOut)
    );

    let summary = listener.tick_at(t0 + Duration::from_secs(10)).unwrap();
    assert_eq!(summary.timeouts, 0);
    assert_eq!(log.borrow().restored.len(), 1);
}

#[test]
fn two_fixtures_share_a_universe() {
    let mut listener = listener();
    let (first, first_log) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    let (second, second_log) = SharedSink::fixture(WhiteChannels::Single, Color::BLACK);
    listener
        .create_receiver(ReceiverConfig::default(), first)
        .unwrap();
    listener
        .create_receiver(
            ReceiverConfig {
                start_channel: 4,
                channel_type: ChannelType::Rgbw,
                ..ReceiverConfig::default()
            },
            second,
        )
        .unwrap();

    listener
        .source_mut()
        .push(sacn_packet(1, &[0, 255, 0, 0, 0, 0, 255]));
    let summary = listener.tick_at(Instant::now()).unwrap();
    assert_eq!(summary.delivered, 2);
    assert_eq!(first_log.borrow().color, Some(Color::rgb(0.0, 1.0, 0.0)));
    let second = second_log.borrow().color.unwrap();
    assert_eq!(second.white, 1.0);
    assert_eq!(second_log.borrow().brightness, Some(1.0));
}

#[test]
fn strip_keeps_pixels_beyond_a_short_universe() {
    let mut listener = listener();
    let (sink, log) = SharedSink::strip(10);
    listener
        .create_receiver(
            ReceiverConfig {
                universe: 4,
                pixel_count: 10,
                blank_on_start: false,
                ..ReceiverConfig::default()
            },
            sink,
        )
        .unwrap();

    listener.source_mut().push(sacn_packet(4, &[255; 18]));
    listener.tick_at(Instant::now()).unwrap();

    let log = log.borrow();
    let pixels = log.pixels.as_ref().unwrap();
    assert!(pixels[..6].iter().all(|p| *p == Some(Color::gray(1.0))));
    assert!(pixels[6..].iter().all(Option::is_none));
}

#[test]
fn strip_holds_last_frame_on_timeout() {
    let mut listener = listener();
    let (sink, log) = SharedSink::strip(2);
    let handle = listener
        .create_receiver(
            ReceiverConfig {
                pixel_count: 2,
                timeout_ms: 100,
                ..ReceiverConfig::default()
            },
            sink,
        )
        .unwrap();
    assert_eq!(
        listener.receiver(handle).unwrap().fallback(),
        FallbackPolicy::HoldLast
    );

    let t0 = Instant::now();
    listener.source_mut().push(sacn_packet(1, &[0, 0, 255, 255, 0, 0]));
    listener.tick_at(t0).unwrap();
    let summary = listener.tick_at(t0 + Duration::from_millis(150)).unwrap();
    assert_eq!(summary.timeouts, 1);

    let log = log.borrow();
    let pixels = log.pixels.as_ref().unwrap();
    assert_eq!(pixels[0], Some(Color::rgb(0.0, 0.0, 1.0)));
    assert_eq!(pixels[1], Some(Color::rgb(1.0, 0.0, 0.0)));
    assert!(log.restored.is_empty());
}

#[test]
fn rejects_are_counted_by_kind() {
    let mut listener = listener();
    let (sink, log) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    listener
        .create_receiver(
            ReceiverConfig {
                blank_on_start: false,
                ..ReceiverConfig::default()
            },
            sink,
        )
        .unwrap();

    let mut bad_start_code = sacn_packet(1, &[255, 255, 255]);
    bad_start_code[125] = 0xdd;
    let mut bad_pid = sacn_packet(1, &[255, 255, 255]);
    bad_pid[4] = b'X';

    let source = listener.source_mut();
    source.push(vec![0u8; 40]);
    source.push(bad_start_code);
    source.push(bad_pid);
    let summary = listener.tick_at(Instant::now()).unwrap();

    assert_eq!(summary.rejected, 3);
    assert_eq!(summary.accepted, 0);
    let stats = listener.stats();
    assert_eq!(stats.rejected_by_kind[&RejectKind::TooShort], 1);
    assert_eq!(stats.rejected_by_kind[&RejectKind::BadStartCode], 1);
    assert_eq!(stats.rejected_by_kind[&RejectKind::BadPacketIdentifier], 1);
    assert!(log.borrow().color.is_none());
}

#[test]
fn alternate_start_code_can_be_enabled() {
    let mut options = ListenerOptions::default();
    options.rules.accepted_start_codes = vec![0x00, 0x04];
    let mut listener = Listener::new(QueueSource::default(), options);
    let (sink, log) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    listener
        .create_receiver(ReceiverConfig::default(), sink)
        .unwrap();

    let mut packet = sacn_packet(1, &[0, 0, 255]);
    packet[125] = 0x04;
    listener.source_mut().push(packet);
    listener.tick_at(Instant::now()).unwrap();
    assert_eq!(log.borrow().color, Some(Color::rgb(0.0, 0.0, 1.0)));
}

#[test]
fn preview_and_terminated_frames() {
    let mut listener = listener();
    let (sink, log) = SharedSink::fixture(WhiteChannels::None, Color::gray(0.5));
    listener
        .create_receiver(
            ReceiverConfig {
                timeout_ms: 0,
                ..ReceiverConfig::default()
            },
            sink,
        )
        .unwrap();

    let t0 = Instant::now();
    listener
        .source_mut()
        .push(sacn_packet_with(1, &[255, 255, 255], OPTION_PREVIEW, 1));
    listener.tick_at(t0).unwrap();
    assert_eq!(log.borrow().color, Some(Color::BLACK));
    assert_eq!(listener.stats().preview_skipped, 1);

    listener
        .source_mut()
        .push(sacn_packet_with(1, &[255, 255, 255], 0, 2));
    listener
        .source_mut()
        .push(sacn_packet_with(1, &[255, 255, 255], OPTION_TERMINATED, 3));
    listener.tick_at(t0).unwrap();
    assert_eq!(log.borrow().restored, vec![Color::gray(0.5)]);
    assert_eq!(listener.stats().stream_terminated, 1);
}

#[test]
fn preview_frames_apply_when_not_ignored() {
    let options = ListenerOptions {
        router: RouterOptions {
            ignore_preview: false,
            ..RouterOptions::default()
        },
        ..ListenerOptions::default()
    };
    let mut listener = Listener::new(QueueSource::default(), options);
    let (sink, log) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    listener
        .create_receiver(ReceiverConfig::default(), sink)
        .unwrap();
    listener
        .source_mut()
        .push(sacn_packet_with(1, &[0, 255, 0], OPTION_PREVIEW, 0));
    listener.tick_at(Instant::now()).unwrap();
    assert_eq!(log.borrow().color, Some(Color::rgb(0.0, 1.0, 0.0)));
}

#[test]
fn unknown_universe_is_counted_but_harmless() {
    let mut listener = listener();
    let (sink, log) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    listener
        .create_receiver(
            ReceiverConfig {
                blank_on_start: false,
                ..ReceiverConfig::default()
            },
            sink,
        )
        .unwrap();
    listener.source_mut().push(sacn_packet(77, &[255; 3]));
    let summary = listener.tick_at(Instant::now()).unwrap();
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.delivered, 0);
    assert_eq!(listener.stats().unrouted, 1);
    assert!(log.borrow().color.is_none());
}

#[test]
fn streams_are_tracked_per_sender() {
    let mut listener = listener();
    let (sink, _) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    listener
        .create_receiver(ReceiverConfig::default(), sink)
        .unwrap();

    let t0 = Instant::now();
    let a = "10.0.0.1:5000".parse().unwrap();
    let b = "10.0.0.2:5000".parse().unwrap();
    listener.source_mut().push_from(a, sacn_packet(1, &[1, 2, 3]));
    listener.source_mut().push_from(a, sacn_packet(1, &[1, 2, 3]));
    listener.source_mut().push_from(b, sacn_packet(1, &[1, 2, 3]));
    listener.tick_at(t0).unwrap();
    assert_eq!(listener.stats().streams_started, 2);

    listener.tick_at(t0 + Duration::from_secs(6)).unwrap();
    assert_eq!(listener.stats().streams_stopped, 2);
}

#[test]
fn destroyed_receiver_returns_its_sink_and_stops() {
    let mut listener = listener();
    let (sink, log) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    let handle = listener
        .create_receiver(ReceiverConfig::default(), sink)
        .unwrap();
    let receiver = listener.destroy_receiver(handle).unwrap();
    assert_eq!(receiver.state(), ReceiverState::Stopped);
    assert!(!listener.source().open);

    let flushes = log.borrow().flushes;
    listener.source_mut().push(sacn_packet(1, &[255; 3]));
    listener.tick_at(Instant::now()).unwrap();
    assert_eq!(log.borrow().flushes, flushes);
    drop(receiver.into_sink());
}

#[test]
fn snapshots_are_ordered_by_universe() {
    let mut listener = listener();
    for (universe, name) in [(9, "nine"), (2, "two"), (5, "five")] {
        let (sink, _) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
        listener
            .create_receiver(
                ReceiverConfig {
                    name: name.to_string(),
                    universe,
                    ..ReceiverConfig::default()
                },
                sink,
            )
            .unwrap();
    }
    let names: Vec<_> = listener.snapshots().into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["two", "five", "nine"]);
}

#[test]
fn fixture_deep_in_a_universe_reads_exact_levels() {
    let mut listener = listener();
    let (sink, log) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    listener
        .create_receiver(
            ReceiverConfig {
                universe: 7,
                start_channel: 17,
                ..ReceiverConfig::default()
            },
            sink,
        )
        .unwrap();

    let mut slots = [0u8; 24];
    slots[16..19].copy_from_slice(&[10, 200, 255]);
    listener.source_mut().push(sacn_packet(7, &slots));
    let summary = listener.tick_at(Instant::now()).unwrap();
    assert_eq!(summary.delivered, 1);

    let log = log.borrow();
    assert_eq!(
        log.color,
        Some(Color::rgb(10.0 / 255.0, 200.0 / 255.0, 1.0))
    );
    assert_eq!(log.brightness, Some(1.0));
}

#[test]
fn gamma_reaches_fixture_and_strip_outputs() {
    let table = GammaTable::default();
    let level = |byte: u8| f32::from(table.apply(byte)) / 255.0;

    let mut listener = listener();
    let (fixture, fixture_log) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    let (strip, strip_log) = SharedSink::strip(2);
    listener
        .create_receiver(
            ReceiverConfig {
                universe: 3,
                gamma_enabled: true,
                ..ReceiverConfig::default()
            },
            fixture,
        )
        .unwrap();
    listener
        .create_receiver(
            ReceiverConfig {
                universe: 3,
                start_channel: 4,
                pixel_count: 2,
                gamma_enabled: true,
                ..ReceiverConfig::default()
            },
            strip,
        )
        .unwrap();

    listener
        .source_mut()
        .push(sacn_packet(3, &[64, 128, 200, 128, 0, 255, 32, 64, 96]));
    let summary = listener.tick_at(Instant::now()).unwrap();
    assert_eq!(summary.delivered, 2);

    assert_eq!(
        fixture_log.borrow().color,
        Some(Color::rgb(level(64), level(128), level(200)))
    );
    assert!(level(128) < 128.0 / 255.0);

    let strip_log = strip_log.borrow();
    let pixels = strip_log.pixels.as_ref().unwrap();
    assert_eq!(pixels[0], Some(Color::rgb(level(128), 0.0, 1.0)));
    assert_eq!(pixels[1], Some(Color::rgb(level(32), level(64), level(96))));
}

#[test]
fn malformed_datagrams_keep_a_stream_alive() {
    let mut listener = listener();
    let (sink, _) = SharedSink::fixture(WhiteChannels::None, Color::BLACK);
    listener
        .create_receiver(ReceiverConfig::default(), sink)
        .unwrap();

    let t0 = Instant::now();
    let sender = "10.0.0.3:5000".parse().unwrap();
    listener.source_mut().push_from(sender, vec![0u8; 12]);
    listener.tick_at(t0).unwrap();
    assert_eq!(listener.stats().rejected, 1);
    assert_eq!(listener.stats().streams_started, 1);

    listener.source_mut().push_from(sender, vec![0u8; 12]);
    listener.tick_at(t0 + Duration::from_secs(4)).unwrap();
    listener.tick_at(t0 + Duration::from_secs(8)).unwrap();
    assert_eq!(listener.stats().streams_stopped, 0);

    listener.tick_at(t0 + Duration::from_secs(10)).unwrap();
    assert_eq!(listener.stats().streams_started, 1);
    assert_eq!(listener.stats().streams_stopped, 1);
}
