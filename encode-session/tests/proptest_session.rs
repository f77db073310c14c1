//! Property-based tests for the session polling protocol.

use encode_session::{EncodeSession, SessionConfig, SessionError, SessionState};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Submit,
    Poll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Submit), Just(Op::Poll)]
}

fn session(lookahead: usize, extra: usize) -> EncodeSession {
    let capacity = if extra == 0 { 0 } else { lookahead + 1 + extra };
    let config = SessionConfig::new(16, 16)
        .with_lookahead(lookahead)
        .with_queue_capacity(capacity);
    EncodeSession::new(config).unwrap()
}

// =============================================================================
// Interleaved Submit and Poll
// =============================================================================

proptest! {
    /// Any interleaving delivers packets in submission order, respects the
    /// queue bound and loses nothing once flushed.
    #[test]
    fn interleaving_preserves_order_and_count(
        lookahead in 0usize..6,
        extra in 0usize..4,
        ops in prop::collection::vec(op_strategy(), 0..80),
    ) {
        let mut s = session(lookahead, extra);
        let frame = s.new_frame().unwrap();
        let mut submitted = 0u64;
        let mut delivered = 0u64;

        for op in ops {
            match op {
                Op::Submit => {
                    let full = s.queued_frames() >= s.capacity();
                    match s.submit_frame(frame.clone()) {
                        Ok(seq) => {
                            prop_assert!(!full);
                            prop_assert_eq!(seq, submitted);
                            submitted += 1;
                        }
                        Err(SessionError::CapacityExceeded { capacity }) => {
                            prop_assert!(full);
                            prop_assert_eq!(capacity, s.capacity());
                        }
                        Err(e) => prop_assert!(false, "unexpected error: {}", e),
                    }
                }
                Op::Poll => match s.poll_packet() {
                    Ok(packet) => {
                        prop_assert_eq!(packet.seq, delivered);
                        delivered += 1;
                    }
                    Err(SessionError::NeedMoreData) => {
                        prop_assert!(submitted - delivered <= lookahead as u64);
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                },
            }
            prop_assert!(s.queued_frames() <= s.capacity());
        }

        s.request_flush().unwrap();
        loop {
            match s.poll_packet() {
                Ok(packet) => {
                    prop_assert_eq!(packet.seq, delivered);
                    delivered += 1;
                }
                Err(SessionError::EndOfStream) => break,
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }

        prop_assert_eq!(delivered, submitted);
        prop_assert_eq!(s.state(), SessionState::Exhausted);
        prop_assert!(s.poll_packet().unwrap_err().is_eof());
    }

    /// With fewer frames than the lookahead depth nothing comes out early.
    #[test]
    fn lookahead_holds_back_packets(lookahead in 1usize..8, count in 0usize..8) {
        prop_assume!(count <= lookahead);
        let mut s = session(lookahead, 0);
        for _ in 0..count {
            let frame = s.new_frame().unwrap();
            s.submit_frame(frame).unwrap();
        }
        prop_assert!(s.poll_packet().unwrap_err().is_need_more_data());
        prop_assert_eq!(s.frames_in_flight(), count as u64);
    }
}
