// Wed Jan 21 2026 - Alex

use crate::diff::classifier::DifferentialClassifier;
use crate::diff::records::Finding;
use crate::diff::results::ScanResults;
use rayon::prelude::*;
use std::ops::Range;

pub const DEFAULT_SHARD_SIZE: usize = 0x40000;

impl<'a> DifferentialClassifier<'a> {
    /// Classifies the image on `threads` rayon workers (0 = rayon's default).
    ///
    /// Each shard is scanned on its own from its first offset, then the shards
    /// are stitched together in file order. Output is identical to `scan`.
    /// Byte stride is required for the stitch; other strides scan
    /// sequentially.
    pub fn scan_parallel<F: FnMut(usize)>(&self, threads: usize, progress: F) -> ScanResults {
        self.scan_sharded(threads, DEFAULT_SHARD_SIZE, progress)
    }

    pub(crate) fn scan_sharded<F: FnMut(usize)>(
        &self,
        threads: usize,
        shard_size: usize,
        mut progress: F,
    ) -> ScanResults {
        let end = self.scan_end();
        let shards = shard_ranges(end, shard_size);

        if self.stride() != 1 || threads == 1 || shards.len() < 2 {
            log::debug!("Scanning sequentially (stride {}, {} shards)", self.stride(), shards.len());
            return self.scan_with_progress(progress);
        }

        log::info!(
            "Searching in range {:#x} - {:#x} across {} shards",
            0,
            end,
            shards.len()
        );

        let run = || -> Vec<Vec<Finding>> {
            shards
                .par_iter()
                .map(|shard| self.scan_range(shard.start, shard.end, &mut |_| {}))
                .collect()
        };

        let shard_findings = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                log::warn!("Failed to build a {} thread pool ({}), using the global pool", threads, e);
                run()
            }
        };

        let mut results = ScanResults::new(self.pointer_width());
        let mut cursor = 0;
        for (shard, findings) in shards.iter().zip(shard_findings) {
            let mut merged = Vec::with_capacity(findings.len());
            cursor = self.stitch_shard(shard, findings, cursor, &mut merged);
            results.extend(merged);
            progress(shard.end);
        }

        results
    }

    /// Replays the sequential scan from `cursor` until it lands on an offset
    /// the shard scan also visited, then takes the shard's findings from there
    /// on. Returns where the sequential scan would continue.
    fn stitch_shard(
        &self,
        shard: &Range<usize>,
        findings: Vec<Finding>,
        mut cursor: usize,
        merged: &mut Vec<Finding>,
    ) -> usize {
        let width = self.pointer_width().bytes();

        while cursor < shard.end {
            let idx = findings.partition_point(|f| (f.offset() as usize) < cursor);
            let inside_finding = idx > 0 && findings[idx - 1].offset() as usize + width > cursor;

            if !inside_finding {
                let mut next = shard.end;
                for finding in findings.into_iter().skip(idx) {
                    next = next.max(finding.offset() as usize + width);
                    merged.push(finding);
                }
                return next;
            }

            match self.classify_at(cursor) {
                Some(finding) => {
                    merged.push(finding);
                    cursor += width;
                }
                None => cursor += 1,
            }
        }

        cursor
    }
}

fn shard_ranges(end: usize, shard_size: usize) -> Vec<Range<usize>> {
    let shard_size = shard_size.max(1);
    (0..end)
        .step_by(shard_size)
        .map(|start| start..(start + shard_size).min(end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::classifier::tests::{DumpSet, BASES, KERNEL32_BASES};
    use crate::memory::PointerWidth;

    fn lcg(state: &mut u64) -> u64 {
        *state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        *state >> 33
    }

    /// Dense dump set with findings packed around shard boundaries.
    fn busy_set(width: PointerWidth) -> DumpSet {
        let mut set = DumpSet::new(0x800, 2, width);
        let mut state = 0x1234_5678;
        let mut offset = 0;
        while offset + 16 < 0x800 {
            let k = lcg(&mut state) % 0x700;
            match lcg(&mut state) % 4 {
                0 => set.put_all(offset, |i| BASES[i] + k),
                1 => set.put_all(offset, |i| KERNEL32_BASES[i] + 0x1100),
                2 => set.put_all(offset, |i| 0x7500_0000 + i as u64 * 0x10_0000 + k),
                _ => {}
            }
            offset += 1 + (lcg(&mut state) % 11) as usize;
        }
        set
    }

    #[test]
    fn test_shard_ranges() {
        assert_eq!(shard_ranges(10, 4), vec![0..4, 4..8, 8..10]);
        assert!(shard_ranges(0, 4).is_empty());
    }

    #[test]
    fn test_sharded_scan_matches_sequential() {
        for width in [PointerWidth::Bits32, PointerWidth::Bits64] {
            let set = busy_set(width);
            let modules = set.build();
            let classifier = DifferentialClassifier::new(&modules, width).unwrap();

            let sequential = classifier.scan();
            assert!(!sequential.is_empty());

            for shard_size in [0x3d, 0x40, 0x101] {
                let sharded = classifier.scan_sharded(4, shard_size, |_| {});
                assert_eq!(sharded.relocations(), sequential.relocations());
                assert_eq!(sharded.imports(), sequential.imports());
                assert_eq!(sharded.memory_references(), sequential.memory_references());
                assert_eq!(
                    sharded.rebuild_data().import_runs(),
                    sequential.rebuild_data().import_runs()
                );
            }
        }
    }

    #[test]
    fn test_finding_straddling_shard_boundary() {
        let mut set = DumpSet::new(0x100, 2, PointerWidth::Bits64);
        set.put_all(0x3c, |i| BASES[i] + 0x10);
        set.put_all(0x44, |i| BASES[i] + 0x20);
        let modules = set.build();
        let classifier = DifferentialClassifier::new(&modules, PointerWidth::Bits64).unwrap();

        let sharded = classifier.scan_sharded(2, 0x40, |_| {});
        let offsets: Vec<_> = sharded.relocations().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0x3c, 0x44]);
    }

    #[test]
    fn test_non_byte_stride_falls_back_to_sequential() {
        let set = busy_set(PointerWidth::Bits64);
        let modules = set.build();
        let classifier = DifferentialClassifier::new(&modules, PointerWidth::Bits64)
            .unwrap()
            .with_stride(8)
            .unwrap();
        let sharded = classifier.scan_sharded(4, 0x40, |_| {});
        assert_eq!(sharded.relocations(), classifier.scan().relocations());
    }
}
