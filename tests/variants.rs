// SPDX-License-Identifier: GPL-3.0-or-later

use multifish::movegen::{GenType, MoveList};
use multifish::position::{Position, START_FEN};
use multifish::types::*;

fn snapshot(pos: &Position) -> (String, Key, Key, Key) {
    (pos.fen(), pos.key(), pos.pawn_key(), pos.material_key())
}

#[test]
fn variant_tag_separates_hashes() {
    let chess = Position::from_fen(START_FEN, CHESS_VARIANT).unwrap();
    let koth = Position::from_fen(START_FEN, KOTH_VARIANT).unwrap();
    let three = Position::from_fen(START_FEN, THREECHECK_VARIANT).unwrap();
    assert_ne!(chess.key(), koth.key());
    assert_ne!(chess.key(), three.key());
    assert_ne!(koth.key(), three.key());
}

// --- Atomic ---

#[test]
fn atomic_capture_explodes_both_pawns() {
    let mut pos = Position::from_fen(
        "rnbqkb1r/ppp1pppp/5n2/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1",
        ATOMIC_VARIANT).unwrap();
    let before = snapshot(&pos);

    let m = Move::make(Square::E4, Square::D5);
    assert!(pos.legal(m));
    let hint = pos.gives_check(m);
    pos.do_move(m, hint);

    assert_eq!(pos.piece_on(Square::D5), NO_PIECE);
    assert_eq!(pos.piece_on(Square::E4), NO_PIECE);
    assert_eq!(pos.count(WHITE, PAWN), 7);
    assert_eq!(pos.count(BLACK, PAWN), 7);

    pos.undo_move(m);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn atomic_blast_removes_adjacent_pieces_but_not_pawns() {
    let mut pos = Position::from_fen(
        "4k3/8/2n5/3p4/8/5B2/8/4K3 w - - 0 1", ATOMIC_VARIANT).unwrap();
    let before = snapshot(&pos);

    let m = Move::make(Square::F3, Square::D5); // Bf3xd5
    let hint = pos.gives_check(m);
    pos.do_move(m, hint);

    // Victim, mover and the adjacent knight are gone; only kings remain
    assert_eq!(pos.count(BLACK, KNIGHT), 0);
    assert_eq!(pos.count(WHITE, BISHOP), 0);
    assert_eq!(pos.count(BLACK, PAWN), 0);
    assert_eq!(multifish::bitboard::popcount(pos.pieces()), 2);

    pos.undo_move(m);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn atomic_king_may_never_capture() {
    let pos = Position::from_fen(
        "4k3/8/8/8/8/8/4r3/4K3 w - - 0 1", ATOMIC_VARIANT).unwrap();

    assert!(pos.checkers() != 0);
    assert!(!pos.legal(Move::make(Square::E1, Square::E2)));

    let list = MoveList::new(&pos, GenType::Legal);
    assert!(!list.contains(Move::make(Square::E1, Square::E2)));
    assert_eq!(list.size(), 2); // Kd1 and Kf1 only
}

#[test]
fn atomic_explosion_can_evade_check() {
    // The knight on f3 gives check; Qa4xf4 blows it up from a distance
    let mut pos = Position::from_fen(
        "4k3/8/8/8/Q4b2/5n2/8/4K3 w - - 0 1", ATOMIC_VARIANT).unwrap();
    assert!(pos.checkers() != 0);

    let m = Move::make(Square::A4, Square::F4); // Qa4xf4
    let list = MoveList::new(&pos, GenType::Legal);
    assert!(list.contains(m));

    let hint = pos.gives_check(m);
    pos.do_move(m, hint);
    assert_eq!(pos.checkers(), multifish::bitboard::Bitboard(0));
    assert_eq!(pos.count(BLACK, KNIGHT), 0);
    assert_eq!(pos.count(WHITE, QUEEN), 0);
}

#[test]
fn atomic_exploding_the_king_decides_the_game() {
    let mut pos = Position::from_fen(
        "4k3/4q3/8/8/8/8/4R3/4K3 w - - 0 1", ATOMIC_VARIANT).unwrap();
    let before = snapshot(&pos);

    let m = Move::make(Square::E2, Square::E7);
    assert!(pos.legal(m));
    assert!(!pos.gives_check(m)); // a variant ending, not a check
    pos.do_move(m, false);

    assert_eq!(pos.count(BLACK, KING), 0);
    assert!(pos.is_atomic_loss());
    assert!(!pos.pseudo_legal(Move::make(Square::E8, Square::E7)));

    pos.undo_move(m);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn atomic_see_scores_the_explosion() {
    // Qa4xf4 trades queen for bishop and knight
    let pos = Position::from_fen(
        "4k3/8/8/8/Q4b2/5n2/8/4K3 w - - 0 1", ATOMIC_VARIANT).unwrap();
    let m = Move::make(Square::A4, Square::F4);
    assert_eq!(pos.see(m), KnightValueMg + BishopValueMg - QueenValueMg);

    // Blasting the enemy king is mate
    let pos = Position::from_fen(
        "4k3/4q3/8/8/8/8/4R3/4K3 w - - 0 1", ATOMIC_VARIANT).unwrap();
    assert_eq!(pos.see(Move::make(Square::E2, Square::E7)), Value::MATE);
}

// --- Three-Check ---

#[test]
fn three_check_counters_round_trip_and_count_up() {
    let mut pos = Position::from_fen(
        "4k3/8/8/8/8/8/R7/4K3 w - - 0 1 +2+0", THREECHECK_VARIANT).unwrap();
    assert_eq!(pos.checks_given(WHITE), 2);
    assert!(pos.fen().ends_with("+2+0"));

    let m = Move::make(Square::A2, Square::A8);
    assert!(pos.gives_check(m));
    assert_eq!(pos.see_sign(m), Value::KNOWN_WIN);

    let before = snapshot(&pos);
    pos.do_move(m, true);
    assert_eq!(pos.checks_given(WHITE), 3);
    assert!(pos.fen().ends_with("+3+0"));
    assert!(pos.is_three_check_loss());
    assert!(!pos.pseudo_legal(Move::make(Square::E8, Square::E7)));

    pos.undo_move(m);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn three_check_counters_feed_the_hash() {
    let one = Position::from_fen(
        "4k3/8/8/8/8/8/R7/4K3 w - - 0 1 +1+0", THREECHECK_VARIANT).unwrap();
    let two = Position::from_fen(
        "4k3/8/8/8/8/8/R7/4K3 w - - 0 1 +2+0", THREECHECK_VARIANT).unwrap();
    assert_ne!(one.key(), two.key());
}

#[test]
fn three_check_rejects_out_of_range_counters() {
    assert!(Position::from_fen(
        "4k3/8/8/8/8/8/R7/4K3 w - - 0 1 +4+0", THREECHECK_VARIANT).is_err());
}

// --- Racing Kings ---

#[test]
fn racing_kings_forbids_checking_moves() {
    let pos = Position::from_fen(
        "8/8/8/8/8/5k2/8/R4K2 w - - 0 1", RACE_VARIANT).unwrap();

    let check = Move::make(Square::A1, Square::A3);
    assert!(pos.gives_check(check));

    let list = MoveList::new(&pos, GenType::Legal);
    assert!(!list.contains(check));
    assert!(list.contains(Move::make(Square::A1, Square::A2)));
}

#[test]
fn racing_kings_rank_8_decides() {
    let pos = Position::from_fen(
        "5K2/8/8/8/8/8/8/k7 b - - 0 1", RACE_VARIANT).unwrap();
    assert!(pos.is_race_loss());
    assert!(!pos.is_race_draw());
    assert!(!pos.pseudo_legal(Move::make(Square::A1, Square::A2)));
}

// --- King of the Hill ---

#[test]
fn koth_center_decides() {
    let pos = Position::from_fen(
        "8/8/8/3K4/8/8/8/4k3 b - - 0 1", KOTH_VARIANT).unwrap();
    assert!(pos.is_koth_loss());
    assert!(!pos.pseudo_legal(Move::make(Square::E1, Square::E2)));

    // Away from the hill the game plays like standard chess
    let pos = Position::from_fen(START_FEN, KOTH_VARIANT).unwrap();
    assert_eq!(MoveList::new(&pos, GenType::Legal).size(), 20);
}

// --- Horde ---

#[test]
fn horde_start_position_loads_all_36_pawns() {
    let mut pos = Position::from_fen(
        "rnbqkbnr/pppppppp/8/1PP2PP1/PPPPPPPP/PPPPPPPP/PPPPPPPP/PPPPPPPP w kq - 0 1",
        HORDE_VARIANT).unwrap();
    assert_eq!(pos.count(WHITE, PAWN), 36);
    assert_eq!(pos.count(WHITE, KING), 0);

    // Four pushes from rank 5 and four from rank 4 are the only moves
    let list = MoveList::new(&pos, GenType::Legal);
    assert_eq!(list.size(), 8);

    let before = snapshot(&pos);
    let m = Move::make(Square::C5, Square::C6);
    pos.do_move(m, pos.gives_check(m));
    pos.undo_move(m);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn horde_pawns_double_push_off_the_first_rank() {
    let pos = Position::from_fen(
        "k7/8/8/8/8/8/8/P7 w - - 0 1", HORDE_VARIANT).unwrap();
    let list = MoveList::new(&pos, GenType::Legal);
    assert_eq!(list.size(), 2);
    assert!(list.contains(Move::make(Square::A1, Square::A2)));
    assert!(list.contains(Move::make(Square::A1, Square::A3)));
}

#[test]
fn horde_first_rank_double_push_sets_no_ep_square() {
    let mut pos = Position::from_fen(
        "k7/8/8/8/8/1p6/8/P7 w - - 0 1", HORDE_VARIANT).unwrap();
    let m = Move::make(Square::A1, Square::A3);
    pos.do_move(m, pos.gives_check(m));
    assert_eq!(pos.ep_square(), Square::NONE);
}

#[test]
fn horde_without_pawns_left_is_decided() {
    let pos = Position::from_fen(
        "k7/8/8/8/8/8/8/8 b - - 0 1", HORDE_VARIANT).unwrap();
    assert!(pos.is_horde_loss());
    assert!(!pos.pseudo_legal(Move::make(Square::A8, Square::A7)));
}

// --- Antichess ---

#[test]
fn antichess_captures_are_compulsory() {
    let pos = Position::from_fen(
        "rnbqkbnr/p1pppppp/8/1p6/8/4P3/PPPP1PPP/RNBQKBNR w - - 0 1",
        ANTI_VARIANT).unwrap();

    let list = MoveList::new(&pos, GenType::Legal);
    assert_eq!(list.size(), 1);
    assert!(list.contains(Move::make(Square::F1, Square::B5))); // Bf1xb5
}

#[test]
fn antichess_has_no_checks() {
    let pos = Position::from_fen(
        "rnbqkbnr/p1pppppp/8/1p6/8/4P3/PPPP1PPP/RNBQKBNR w - - 0 1",
        ANTI_VARIANT).unwrap();
    assert_eq!(pos.checkers(), multifish::bitboard::Bitboard(0));
    for m in MoveList::new(&pos, GenType::Legal) {
        assert!(!pos.gives_check(m));
        assert!(pos.legal(m));
    }
}

#[test]
fn antichess_running_out_of_pieces_decides() {
    let pos = Position::from_fen(
        "7K/8/8/8/8/8/8/8 w - - 0 1", ANTI_VARIANT).unwrap();
    assert!(pos.is_anti_loss());
    assert!(!pos.pseudo_legal(Move::make(Square::H8, Square::H7)));
}
