// SPDX-License-Identifier: GPL-3.0-or-later

use multifish::movegen::{GenType, MoveList};
use multifish::position::{FenError, Position, START_FEN};
use multifish::types::*;

const KIWIPETE: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn snapshot(pos: &Position) -> (String, Key, Key, Key, Score) {
    (pos.fen(), pos.key(), pos.pawn_key(), pos.material_key(),
     pos.psq_score())
}

// Walk the legal move tree to a small depth, checking after every
// do_move/undo_move pair that the position came back bit-exact.
fn walk_and_check(pos: &mut Position, depth: i32) {
    if depth == 0 {
        return;
    }
    let before = snapshot(pos);
    for m in MoveList::new(pos, GenType::Legal) {
        let gives_check = pos.gives_check(m);
        pos.do_move(m, gives_check);
        walk_and_check(pos, depth - 1);
        pos.undo_move(m);
        assert_eq!(snapshot(pos), before, "undo drift after {:?}", m);
    }
}

#[test]
fn do_undo_restores_the_position_exactly() {
    let mut pos = Position::from_fen(START_FEN, CHESS_VARIANT).unwrap();
    walk_and_check(&mut pos, 2);

    // Kiwipete covers castling, en passant and promotions in one tree
    let mut pos = Position::from_fen(KIWIPETE, CHESS_VARIANT).unwrap();
    walk_and_check(&mut pos, 2);
}

#[test]
fn fen_round_trips() {
    for fen in &[
        START_FEN,
        KIWIPETE,
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    ] {
        let pos = Position::from_fen(fen, CHESS_VARIANT).unwrap();
        assert_eq!(&pos.fen(), fen);
    }
}

#[test]
fn chess960_fen_uses_shredder_notation() {
    let fen = "bqnb1rkr/pp3ppp/3ppn2/2p5/5P2/P2P4/NPP1P1PP/BQ1BNRKR w HFhf - 2 9";
    let pos = Position::from_fen(fen, CHESS960_VARIANT).unwrap();
    assert!(pos.is_chess960());
    assert_eq!(&pos.fen(), fen);
}

#[test]
fn castling_detection_flags_chess960() {
    // Standard corners, classical notation: not 960
    let pos = Position::from_fen(START_FEN, CHESS_VARIANT).unwrap();
    assert!(!pos.is_chess960());

    // Inner rook implies 960 even without the variant bit
    let pos = Position::from_fen(
        "1rk4r/8/8/8/8/8/8/1RK4R w HBhb - 0 1", CHESS_VARIANT).unwrap();
    assert!(pos.is_chess960());
}

#[test]
fn en_passant_is_accepted_only_when_capturable() {
    // Black pawn on d4 attacks e3: keep the square
    let pos = Position::from_fen(
        "rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        CHESS_VARIANT).unwrap();
    assert_eq!(pos.ep_square(), Square::E3);

    // No attacking pawn: drop it
    let pos = Position::from_fen(
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        CHESS_VARIANT).unwrap();
    assert_eq!(pos.ep_square(), Square::NONE);
}

#[test]
fn malformed_fens_are_rejected() {
    assert!(Position::from_fen("", CHESS_VARIANT).is_err());
    assert!(Position::from_fen("rnbqkbnr/pppppppp", CHESS_VARIANT).is_err());
    match Position::from_fen(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
        CHESS_VARIANT)
    {
        Err(FenError::ActiveColor) => (),
        _ => panic!("bad active color accepted"),
    }
    // Two white kings
    assert!(Position::from_fen(
        "4k3/8/8/8/8/8/8/K3K3 w - - 0 1", CHESS_VARIANT).is_err());
    // Bad counters
    assert!(Position::from_fen(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1",
        CHESS_VARIANT).is_err());
}

#[test]
fn incremental_keys_match_scratch_after_deep_lines() {
    // pos_is_ok() re-derives the keys from scratch in debug builds and is
    // asserted inside do_move, so a two-ply walk doubles as a drift test.
    let mut pos = Position::from_fen(KIWIPETE, CHESS_VARIANT).unwrap();
    walk_and_check(&mut pos, 2);
    assert!(pos.pos_is_ok());
}

#[test]
fn gives_check_matches_checkers_after_do_move() {
    for fen in &[START_FEN, KIWIPETE,
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8"]
    {
        let mut pos = Position::from_fen(fen, CHESS_VARIANT).unwrap();
        for m in MoveList::new(&pos, GenType::Legal) {
            let hint = pos.gives_check(m);
            pos.do_move(m, hint);
            assert_eq!(pos.checkers() != 0, hint, "hint mismatch on {:?}", m);
            pos.undo_move(m);
        }
    }
}

#[test]
fn null_move_round_trips() {
    let mut pos = Position::from_fen(KIWIPETE, CHESS_VARIANT).unwrap();
    let before = snapshot(&pos);
    pos.do_null_move();
    assert_eq!(pos.side_to_move(), BLACK);
    assert_ne!(pos.key(), before.1);
    pos.undo_null_move();
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn key_after_predicts_quiet_and_capture_keys() {
    let mut pos = Position::from_fen(START_FEN, CHESS_VARIANT).unwrap();
    // A quiet knight move neither captures nor touches ep/castling state
    let m = Move::make(Square::B1, Square::C3);
    let predicted = pos.key_after(m);
    pos.do_move(m, false);
    assert_eq!(pos.key(), predicted);
    pos.undo_move(m);

    // Bishop takes a6 in Kiwipete: a plain capture
    let mut pos = Position::from_fen(KIWIPETE, CHESS_VARIANT).unwrap();
    let m = Move::make(Square::E2, Square::A6);
    let predicted = pos.key_after(m);
    pos.do_move(m, pos.gives_check(m));
    assert_eq!(pos.key(), predicted);
}

#[test]
fn threefold_repetition_is_detected() {
    let mut pos = Position::from_fen(START_FEN, CHESS_VARIANT).unwrap();
    let cycle = [
        Move::make(Square::G1, Square::F3),  // Ng1-f3
        Move::make(Square::G8, Square::F6), // Ng8-f6
        Move::make(Square::F3, Square::G1),  // Nf3-g1
        Move::make(Square::F6, Square::G8), // Nf6-g8
    ];

    for &m in &cycle {
        assert!(!pos.is_draw(0));
        pos.do_move(m, false);
    }
    // First repetition: a draw inside the search tree, not in the game
    assert!(pos.is_draw(64));
    assert!(!pos.is_draw(0));

    for &m in &cycle {
        pos.do_move(m, false);
    }
    // Second repetition: a draw no matter where the root is
    assert!(pos.is_draw(0));
}

#[test]
fn fifty_move_rule_draws() {
    let pos = Position::from_fen(
        "r7/8/8/8/4k3/8/8/4K3 w - - 100 80", CHESS_VARIANT).unwrap();
    assert!(pos.is_draw(0));

    let pos = Position::from_fen(
        "r7/8/8/8/4k3/8/8/4K3 w - - 99 80", CHESS_VARIANT).unwrap();
    assert!(!pos.is_draw(0));
}

#[test]
fn flip_is_an_involution() {
    let mut pos = Position::from_fen(KIWIPETE, CHESS_VARIANT).unwrap();
    let original = pos.fen();
    pos.flip();
    assert_ne!(pos.fen(), original);
    assert_eq!(pos.side_to_move(), BLACK);
    pos.flip();
    assert_eq!(pos.fen(), original);
}

#[test]
fn pseudo_legal_validates_tt_moves() {
    let pos = Position::from_fen(KIWIPETE, CHESS_VARIANT).unwrap();

    for m in MoveList::new(&pos, GenType::Legal) {
        assert!(pos.pseudo_legal(m), "{:?} rejected", m);
    }

    // Corrupt moves must be rejected
    assert!(!pos.pseudo_legal(Move::make(Square::E2, Square::E2 + NORTH)));
    assert!(!pos.pseudo_legal(Move::make(Square::A8, Square::A1)));
    assert!(!pos.pseudo_legal(Move::make(Square::A3, Square::B3)));
}

#[test]
fn pseudo_legal_agrees_with_generation() {
    // Property: for every from/to pair, pseudo_legal() of a NORMAL move
    // equals membership in the generated legal/pseudo-legal sets, modulo
    // legality filtering.
    let pos = Position::from_fen(
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", CHESS_VARIANT).unwrap();
    let legal = MoveList::new(&pos, GenType::Legal);
    for from in 0..64 {
        for to in 0..64 {
            if from == to {
                continue;
            }
            let m = Move::make(Square(from), Square(to));
            if pos.pseudo_legal(m) {
                assert!(legal.contains(m) || !pos.legal(m),
                    "{:?} pseudo-legal but unaccounted", m);
            } else {
                assert!(!legal.contains(m), "{:?} legal but not pseudo", m);
            }
        }
    }
}
