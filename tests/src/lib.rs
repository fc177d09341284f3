#[cfg(test)]
mod tests {
    use plr_engine::prelude::*;
    use plr_engine::{greedy_segmentation, key_from_f64, key_to_f64};
    use rand::{thread_rng, Rng};
    use rand_distr::{Exp, Uniform};
    use tempfile::tempdir;

    const FIXTURE: &str = include_str!("../fixtures/segments.csv");
    const FIXTURE_GAMMA: f64 = 0.0005;

    /// Parses the `x_start,x_end,slope,y` segment table
    fn fixture() -> SegmentArray<u64> {
        let segments: Vec<Segment<u64>> = FIXTURE
            .lines()
            .filter(|line| !line.starts_with('#') && !line.starts_with("x_start"))
            .map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                let x_start = fields[0].parse().unwrap();
                let slope: f64 = fields[2].parse().unwrap();
                let intercept: f64 = fields[3].parse().unwrap();
                match fields[1] {
                    "" => Segment::new(x_start, slope, intercept),
                    end => Segment::with_end(x_start, end.parse().unwrap(), slope, intercept),
                }
            })
            .collect();

        SegmentArray::from_segments(FIXTURE_GAMMA, Layout::Compact, segments).unwrap()
    }

    /// Sorted unique keys with exponentially distributed gaps
    fn random_keys<K: Key>(num: usize, mean_gap: f64) -> Vec<K> {
        let mut rng = thread_rng();
        let gaps = Exp::new(1.0 / mean_gap).unwrap();

        let mut key = 0.0f64;
        let mut keys = Vec::with_capacity(num);
        while keys.len() < num {
            key += rng.sample(gaps).max(1.0).floor();
            keys.push(key_from_f64(key).unwrap());
        }
        keys
    }

    fn points<K: Key>(keys: &[K]) -> Vec<Point> {
        keys.iter()
            .enumerate()
            .map(|(rank, &key)| Point::new(key_to_f64(key), rank as f64))
            .collect()
    }

    fn assert_positions<K: Key>(array: &SegmentArray<K>, keys: &[K]) {
        let width = (2.0 * array.gamma()).ceil() as i64 + 1;
        for (rank, &key) in keys.iter().enumerate() {
            let pos = array.lookup(key).unwrap();
            assert!(
                pos.contains(rank as i64),
                "key {key:?} at {rank} looked up as {pos:?}"
            );
            assert!(pos.hi - pos.lo <= width, "{pos:?} wider than {width}");
        }
    }

    #[test]
    fn fixture_lookups() {
        let array = fixture();
        assert_eq!(array.len(), 13);

        assert_eq!(array.lookup(6152), Ok(ApproxPos { lo: 12, hi: 13 }));
        assert_eq!(array.lookup(9661), Ok(ApproxPos { lo: 20, hi: 21 }));

        let covering = [(6152u64, 0.00184995, 0.620625), (9661, 0.00175636, 3.19647)];
        for (key, slope, intercept) in covering {
            let predicted = slope * key as f64 + intercept;
            let pos = array.lookup(key).unwrap();
            assert_eq!(pos.lo, (predicted - FIXTURE_GAMMA).floor() as i64);
            assert_eq!(pos.hi, (predicted + FIXTURE_GAMMA).ceil() as i64);
        }
    }

    #[test]
    fn fixture_blobs_on_disk() {
        let temp_dir = tempdir().unwrap();
        let array = fixture();

        let raw_path = temp_dir.path().join("fixture.raw");
        std::fs::write(&raw_path, array.encode_raw().unwrap()).unwrap();
        let raw_bytes = std::fs::read(&raw_path).unwrap();
        let raw = SegmentArray::<u64>::decode_raw(&raw_bytes, Layout::Compact).unwrap();
        assert_eq!(raw, array);
        assert_eq!(raw.lookup(6152), array.lookup(6152));

        let framed_path = temp_dir.path().join("fixture.plr");
        std::fs::write(&framed_path, array.clone().into_bytes().unwrap()).unwrap();
        let framed = SegmentArray::<u64>::decode(&std::fs::read(&framed_path).unwrap()).unwrap();
        assert_eq!(framed.layout(), Layout::Compact);
        assert_eq!(framed.gamma(), FIXTURE_GAMMA);
        assert_eq!(framed, array);
    }

    #[test]
    fn fixture_before_first_key() {
        let mut array = fixture();
        array.clear();
        array.extend(fixture().iter().skip(1).copied()).unwrap();

        assert_eq!(array.lookup(5), Err(LookupError::BeforeFirstSegment));

        let array = array.with_out_of_range(OutOfRange::Clamp);
        assert_eq!(array.segment_for(5).unwrap().x_start, 812);
    }

    fn train_and_check<K: Key>(gamma: f64, num: usize, mean_gap: f64) {
        let keys: Vec<K> = random_keys(num, mean_gap);
        let array = SegmentArray::<K>::train(gamma, Layout::Ranged, points(&keys)).unwrap();
        assert!(!array.is_empty());
        assert_positions(&array, &keys);

        // Every segment's range ends where the next one starts at the latest
        for pair in array.segments().windows(2) {
            assert!(pair[0].x_end.unwrap() <= pair[1].x_start);
        }
        assert_eq!(array.last().unwrap().x_end, Some(*keys.last().unwrap() + K::one()));

        let decoded = SegmentArray::<K>::decode(&array.encode().unwrap()).unwrap();
        assert_positions(&decoded, &keys);
    }

    #[test]
    fn random_streams() {
        train_and_check::<u64>(0.0005, 50_000, 600.0);
        train_and_check::<u64>(8.0, 50_000, 600.0);
        train_and_check::<u32>(1.0, 20_000, 40.0);
        train_and_check::<i64>(2.0, 20_000, 1_000.0);
        train_and_check::<u128>(0.5, 20_000, 10_000.0);
    }

    #[test]
    fn streaming_matches_batch() {
        let keys: Vec<u64> = random_keys(10_000, 250.0);
        let data = points(&keys);

        let mut plr = GreedyPlr::<u64>::new(4.0).unwrap();
        let mut streamed = Vec::new();
        for &point in &data {
            streamed.extend(plr.feed(point).unwrap());
        }
        streamed.extend(plr.finish().unwrap());
        assert_eq!(plr.emitted(), streamed.len());

        let batch = greedy_segmentation::<u64>(4.0, data.clone()).unwrap();
        let array = SegmentArray::<u64>::train(4.0, Layout::Ranged, data).unwrap();
        assert_eq!(streamed, batch);
        assert_eq!(array.segments(), &batch[..]);
    }

    #[test]
    fn larger_gamma_needs_fewer_segments() {
        let keys: Vec<u64> = random_keys(20_000, 100.0);
        let data = points(&keys);

        let fine = SegmentArray::<u64>::train(1.0, Layout::Ranged, data.clone()).unwrap();
        let coarse = SegmentArray::<u64>::train(256.0, Layout::Ranged, data).unwrap();
        assert!(coarse.len() < fine.len());
        assert_positions(&coarse, &keys);
    }

    #[test]
    fn shared_readers() {
        let keys: Vec<u64> = random_keys(10_000, 100.0);
        let array = SegmentArray::<u64>::train(2.0, Layout::Ranged, points(&keys)).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let mut rng = thread_rng();
                    let ranks = Uniform::new(0, keys.len());
                    for _ in 0..1_000 {
                        let rank = rng.sample(ranks);
                        assert!(array.lookup(keys[rank]).unwrap().contains(rank as i64));
                    }
                });
            }
        });
    }
}
