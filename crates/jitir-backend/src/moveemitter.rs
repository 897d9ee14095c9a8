//! Phi destruction during emission (§4.5), shared verbatim across all three
//! backends behind a small [`MoveEmitter`] trait each one implements for its
//! own register/slot addressing.

use std::collections::HashSet;

use jitir_core::ValueId;
use jitir_transform::EdgeBindings;

/// What a backend needs to provide so [`emit_phi_destructions`] can drive
/// phi destruction for it.
pub trait MoveEmitter {
    type Error;

    /// Snapshot `value`'s current contents into a fresh temporary, keyed by
    /// `value` itself, before any binding on this edge can overwrite it.
    fn snapshot_to_temporary(&mut self, value: ValueId) -> Result<(), Self::Error>;

    /// Write `src`'s value into `dest`'s register/slot. `src_is_intermediate`
    /// is `true` when `src` was snapshotted by a prior
    /// `snapshot_to_temporary` call on this same edge, in which case the
    /// emitter must read from that temporary rather than from `src` directly
    /// (which may already have been overwritten by an earlier binding).
    fn emit_move(&mut self, dest: ValueId, src: ValueId, src_is_intermediate: bool) -> Result<(), Self::Error>;
}

/// Destruct every phi binding on one predecessor edge (§4.5 "Phi destruction
/// during emission"):
///
/// 1. Snapshot every intermediate value first, so later bindings can read
///    the pre-edge value even after an earlier binding overwrites it.
/// 2. Emit one move per binding, reading from the snapshot when the source
///    was flagged intermediate.
pub fn emit_phi_destructions<E: MoveEmitter>(emitter: &mut E, edges: &[EdgeBindings]) -> Result<(), E::Error> {
    for edge in edges {
        let mut snapshotted: HashSet<ValueId> = HashSet::new();
        for &value in &edge.intermediates {
            emitter.snapshot_to_temporary(value)?;
            snapshotted.insert(value);
        }
        for &(phi, value) in &edge.bindings {
            let is_intermediate = snapshotted.contains(&value);
            emitter.emit_move(phi, value, is_intermediate)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::BasicBlockId;

    #[derive(Debug, Default)]
    struct RecordingEmitter {
        log: Vec<String>,
    }

    impl MoveEmitter for RecordingEmitter {
        type Error = std::convert::Infallible;

        fn snapshot_to_temporary(&mut self, value: ValueId) -> Result<(), Self::Error> {
            self.log.push(format!("snapshot {value}"));
            Ok(())
        }

        fn emit_move(&mut self, dest: ValueId, src: ValueId, src_is_intermediate: bool) -> Result<(), Self::Error> {
            if src_is_intermediate {
                self.log.push(format!("{dest} <- tmp({src})"));
            } else {
                self.log.push(format!("{dest} <- {src}"));
            }
            Ok(())
        }
    }

    #[test]
    fn no_intermediates_emits_only_moves() {
        let edges = vec![EdgeBindings {
            target: BasicBlockId(1),
            bindings: vec![(ValueId(10), ValueId(1))],
            intermediates: HashSet::new(),
        }];
        let mut emitter = RecordingEmitter::default();
        emit_phi_destructions(&mut emitter, &edges).unwrap();
        assert_eq!(emitter.log, vec!["v10 <- v1".to_string()]);
    }

    /// Scenario 5 (§8): both sides of a swap are flagged intermediate, so
    /// both moves read from their snapshot rather than from each other.
    #[test]
    fn swap_reads_both_sides_from_their_snapshot() {
        let mut intermediates = HashSet::new();
        intermediates.insert(ValueId(1));
        intermediates.insert(ValueId(2));
        let edges = vec![EdgeBindings {
            target: BasicBlockId(1),
            bindings: vec![(ValueId(1), ValueId(2)), (ValueId(2), ValueId(1))],
            intermediates,
        }];
        let mut emitter = RecordingEmitter::default();
        emit_phi_destructions(&mut emitter, &edges).unwrap();
        assert_eq!(
            emitter.log,
            vec![
                "snapshot v1".to_string(),
                "snapshot v2".to_string(),
                "v1 <- tmp(v2)".to_string(),
                "v2 <- tmp(v1)".to_string(),
            ]
        );
    }
}
