use super::*;

fn frame(tag: u8) -> Frame {
    Frame::rgba8(1, 1, vec![tag, 0, 0, 255]).unwrap()
}

#[test]
fn generation_advances_monotonically() {
    let g = Generation::new();
    assert_eq!(g.current(), 0);
    assert_eq!(g.advance(), 1);
    let shared = g.clone();
    assert_eq!(shared.advance(), 2);
    assert!(g.is_current(2));
    assert!(!g.is_current(1));
}

#[test]
fn slot_keeps_only_the_latest_frame() {
    let slot = FrameSlot::new();
    assert!(slot.put(StampedFrame {
        generation: 1,
        frame: frame(1)
    }));
    assert!(slot.put(StampedFrame {
        generation: 1,
        frame: frame(2)
    }));
    assert_eq!(slot.overwritten(), 1);
    let got = slot.take().unwrap();
    assert_eq!(got.frame.data[0], 2);
    assert!(slot.take_timeout(Duration::from_millis(10)).is_none());
}

#[test]
fn close_wakes_a_waiting_worker_and_rejects_puts() {
    let slot = Arc::new(FrameSlot::new());
    let worker = {
        let slot = slot.clone();
        std::thread::spawn(move || slot.take())
    };
    std::thread::sleep(Duration::from_millis(20));
    slot.close();
    assert!(worker.join().unwrap().is_none());
    assert!(!slot.put(StampedFrame {
        generation: 0,
        frame: frame(0)
    }));
}

#[test]
fn feed_stamps_with_the_current_generation() {
    let slot = Arc::new(FrameSlot::new());
    let generation = Generation::new();
    generation.advance();
    let feed = FrameFeed::new(slot.clone(), generation.clone());

    let acquired_at = feed.generation();
    generation.advance();
    feed.offer_stamped(acquired_at, frame(1));
    assert_eq!(slot.take().unwrap().generation, 1);

    feed.offer(frame(2));
    assert_eq!(slot.take().unwrap().generation, 2);
}
