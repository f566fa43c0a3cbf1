use itertools::Itertools;
use score_meter::{
    primitives::{fraction_sum, slash_mixed_to_fraction, slash_to_fraction},
    MeterError, MeterNode, MeterSequence, MeterTerminal, Partition,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_conserved(sequence: &MeterSequence) {
    let sum: f64 = sequence.iter().map(MeterNode::quarter_length).sum();
    assert!(
        (sum - sequence.quarter_length()).abs() < 1e-7,
        "{sequence} does not sum to {}",
        sequence.quarter_length()
    );
}

#[test]
fn test_slash_round_trip() {
    for (n, d) in (1..=16_u64).cartesian_product([1_u64, 2, 4, 8, 16, 32]) {
        assert_eq!(slash_to_fraction(&format!("{n}/{d}")), Ok((n, d)));
    }
    assert_eq!(fraction_sum(&[(3, 8), (5, 8), (1, 8)]), Ok((9, 8)));
    assert_eq!(fraction_sum(&[(1, 13), (2, 17)]), Ok((43, 221)));
    assert_eq!(
        slash_mixed_to_fraction("3+2+5/8"),
        Ok((vec![(3, 8), (2, 8), (5, 8)], true))
    );
    assert!(matches!(
        slash_mixed_to_fraction("3+2+5/8+3/4+2+1+4"),
        Err(MeterError::Format { .. })
    ));
}

#[test]
fn test_partitions_conserve_span() {
    init();
    let mut sequence = MeterSequence::new("12/8", None).unwrap();
    let partitions: Vec<Partition> = vec![
        2_usize.into(),
        3_usize.into(),
        4_usize.into(),
        5_usize.into(),
        7_usize.into(),
        vec!["3/8", "5/8", "4/8"].into(),
        vec![2_u64, 2, 2, 6].into(),
        MeterSequence::new("3/2", Some(3)).unwrap().into(),
    ];
    for partition in partitions {
        sequence.partition(partition).unwrap();
        assert_conserved(&sequence);
        assert_eq!(sequence.ratio(), (12, 8));
    }
    sequence.subdivide_partitions_equal(None).unwrap();
    assert_conserved(&sequence);
    assert_eq!(sequence.flat().quarter_length(), 6.0);
}

#[test]
fn test_five_eight_by_two() {
    init();
    let mut sequence = MeterSequence::new("5/8", None).unwrap();
    sequence.partition_by_count(2).unwrap();
    assert_eq!(sequence.to_string(), "{2/8+3/8}");
    assert_eq!(MeterSequence::new("5/8", Some(2)).unwrap(), sequence);
}

#[test]
fn test_list_must_sum() {
    init();
    let mut sequence = MeterSequence::new("4/4", None).unwrap();
    let before = sequence.clone();
    assert!(matches!(
        sequence.partition_by_list(
            ["3/4", "1/8", "5/8"].into_iter().map_into().collect()
        ),
        Err(MeterError::Partition(_))
    ));
    assert_eq!(sequence, before);
}

#[test]
fn test_position_to_index_monotonic() {
    init();
    let sequence = MeterSequence::new("7/8", Some(3)).unwrap();
    assert_eq!(sequence.to_string(), "{2/8+2/8+3/8}");
    let indices = (0..35)
        .map(|step| sequence.position_to_index(step as f64 * 0.1).unwrap())
        .collect_vec();
    assert!(indices.iter().tuple_windows().all(|(a, b)| a <= b));
    assert_eq!(indices.first(), Some(&0));
    assert_eq!(indices.last(), Some(&2));
    for position in [-0.1, 3.5, 10.0] {
        assert!(matches!(
            sequence.position_to_index(position),
            Err(MeterError::Position { .. })
        ));
    }
}

#[test]
fn test_position_to_address() {
    init();
    let mut sequence: MeterSequence = "3/4".parse().unwrap();
    sequence.partition_by_count(3).unwrap();
    sequence
        .set(1, MeterTerminal::new(1, 4).unwrap().subdivide_by_count(4).unwrap())
        .unwrap();
    assert_eq!(sequence.to_string(), "{1/4+{1/16+1/16+1/16+1/16}+1/4}");
    assert_eq!(sequence.position_to_address(1.5), Ok(vec![1, 2]));
    [0.0, 1.0, 1.25, 2.5]
        .iter()
        .map(|position| sequence.position_to_address(*position).unwrap())
        .zip_eq([vec![0], vec![1, 0], vec![1, 1], vec![2]])
        .for_each(|(found, expected)| assert_eq!(found, expected));
}

#[test]
fn test_get_level() {
    init();
    let mut sequence = MeterSequence::new("4/4", Some(2)).unwrap();
    sequence.subdivide_partitions_equal(Some(2)).unwrap();
    let mut nested = sequence.get(0).unwrap().as_sequence().unwrap().clone();
    nested.subdivide_partitions_equal(Some(2)).unwrap();
    sequence.set(0, nested).unwrap();
    assert_eq!(sequence.depth(), 3);

    let spans = (0..4)
        .map(|depth| {
            let level = sequence.get_level(depth);
            assert_eq!(level.quarter_length(), sequence.quarter_length());
            assert_eq!(level.depth(), 1);
            level.len()
        })
        .collect_vec();
    assert_eq!(spans, vec![2, 4, 6, 6]);
    assert_eq!(sequence.get_level(0).len(), sequence.len());
}

#[test]
fn test_spans_out_of_range() {
    init();
    for text in ["4611686018427387904/1", "1/4294967311+1/4294967291"] {
        assert!(matches!(
            MeterSequence::new(text, None),
            Err(MeterError::Format { .. })
        ));
    }
    let terminal = MeterTerminal::new(1 << 40, 1).unwrap();
    assert!(matches!(
        terminal.subdivide_by_list(&[1 << 30, 1]),
        Err(MeterError::Partition(_))
    ));
}
