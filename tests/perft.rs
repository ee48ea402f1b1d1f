// SPDX-License-Identifier: GPL-3.0-or-later

// Full-depth move-count tests. These exercise every move type, the
// legality tests and do/undo at once: a single miscounted node fails them.

use multifish::movegen::perft;
use multifish::position::{Position, START_FEN};
use multifish::types::{CHESS960_VARIANT, CHESS_VARIANT};

fn perft_from(fen: &str, depth: i32) -> u64 {
    let mut pos = Position::from_fen(fen, CHESS_VARIANT).unwrap();
    perft(&mut pos, depth)
}

#[test]
fn start_position_shallow() {
    assert_eq!(perft_from(START_FEN, 1), 20);
    assert_eq!(perft_from(START_FEN, 2), 400);
    assert_eq!(perft_from(START_FEN, 3), 8_902);
    assert_eq!(perft_from(START_FEN, 4), 197_281);
}

#[test]
fn start_position_depth_5() {
    assert_eq!(perft_from(START_FEN, 5), 4_865_609);
}

#[test]
fn kiwipete_depth_4() {
    assert_eq!(
        perft_from(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            4),
        4_085_603);
}

#[test]
fn position_3_depth_5() {
    assert_eq!(
        perft_from("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 5),
        674_624);
}

#[test]
fn position_4_depth_4() {
    assert_eq!(
        perft_from(
            "r3k2r/Pp1p1pb1/1n1Qp1p1/2qPN3/1p2P3/2N5/P1p1B1PP/R3K2R b KQkq - 0 1",
            4),
        422_333);
}

#[test]
fn position_5_depth_4() {
    assert_eq!(
        perft_from(
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            4),
        2_103_487);
}

#[test]
fn chess960_depth_4() {
    let mut pos = Position::from_fen(
        "bqnb1rkr/pp3ppp/3ppn2/2p5/5P2/P2P4/NPP1P1PP/BQ1BNRKR w HFhf - 2 9",
        CHESS960_VARIANT).unwrap();
    assert!(pos.is_chess960());
    assert_eq!(perft(&mut pos, 4), 9_421_566);
}
