// SPDX-License-Identifier: GPL-3.0-or-later

use crate::bitboard::*;
use crate::movegen::{GenType, MoveList};
use crate::psqt;
use crate::types::*;

use arrayvec::ArrayVec;
use thiserror::Error;

pub mod zobrist {
    use crate::bitboard::Bitboard;
    use crate::misc;
    use crate::types::*;

    use std::sync::OnceLock;

    struct Keys {
        psq: [[Key; 64]; 16],
        enpassant: [Key; 8],
        castling: [Key; 16],
        side: Key,
        no_pawns: Key,
        checks: [[Key; 4]; 2],
    }

    static KEYS: OnceLock<Keys> = OnceLock::new();

    fn keys() -> &'static Keys {
        KEYS.get_or_init(compute)
    }

    pub fn psq(pc: Piece, s: Square) -> Key {
        keys().psq[pc.0 as usize][s.0 as usize]
    }

    pub fn material(pc: Piece, num: i32) -> Key {
        keys().psq[pc.0 as usize][num as usize]
    }

    pub fn enpassant(f: File) -> Key {
        keys().enpassant[f as usize]
    }

    pub fn castling(cr: CastlingRight) -> Key {
        keys().castling[cr.0 as usize]
    }

    pub fn side() -> Key {
        keys().side
    }

    pub fn no_pawns() -> Key {
        keys().no_pawns
    }

    pub fn checks(c: Color, n: i32) -> Key {
        keys().checks[c.0 as usize][n as usize]
    }

    // The various arrays used to compute hash keys are filled from a PRNG
    // with a fixed seed, so every process generates the same keys.

    fn compute() -> Keys {
        let mut rng = misc::Prng::new(1070372);
        let mut k = Keys {
            psq: [[Key(0); 64]; 16],
            enpassant: [Key(0); 8],
            castling: [Key(0); 16],
            side: Key(0),
            no_pawns: Key(0),
            checks: [[Key(0); 4]; 2],
        };

        for c in WHITE.take(2) {
            for pt in 1..7 {
                for s in 0..64 {
                    k.psq[Piece::make(c, PieceType(pt)).0 as usize][s] =
                        Key(rng.rand64());
                }
            }
        }

        for f in 0..8 {
            k.enpassant[f] = Key(rng.rand64());
        }

        // Keys for non-singleton castling-rights masks are the XOR of
        // their singleton components.
        for cr in 0..16u64 {
            let b = Bitboard(cr);
            for s in b {
                let key = k.castling[1usize << s.0];
                k.castling[cr as usize] ^=
                    if key.0 != 0 { key } else { Key(rng.rand64()) };
            }
        }

        k.side = Key(rng.rand64());
        k.no_pawns = Key(rng.rand64());

        for c in WHITE.take(2) {
            for n in 0..4 {
                k.checks[c.0 as usize][n] = Key(rng.rand64());
            }
        }

        k
    }
}

pub const START_FEN: &str =
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("incomplete FEN: missing {0} field")]
    Missing(&'static str),
    #[error("invalid piece placement")]
    PiecePlacement,
    #[error("invalid active color")]
    ActiveColor,
    #[error("invalid halfmove clock or fullmove number")]
    MoveCounters,
    #[error("invalid check counters")]
    CheckCounters,
    #[error("wrong number of kings for the variant")]
    KingCount,
}

// Upper bound on the pieces an explosion can remove: the moving piece plus
// the eight squares around the destination.
const BLAST_CAP: usize = 9;

#[derive(Clone)]
pub struct StateInfo {
    // Copied when making a move
    pub pawn_key: Key,
    pub material_key: Key,
    pub non_pawn_material: [Value; 2],
    pub castling_rights: CastlingRight,
    pub rule50: i32,
    pub plies_from_null: i32,
    pub psq: Score,
    pub ep_square: Square,
    pub checks_given: [i32; 2],

    // Not copied when making a move (will be recomputed anyhow)
    pub key: Key,
    pub checkers_bb: Bitboard,
    pub captured_piece: Piece,
    pub blast: ArrayVec<(Square, Piece), BLAST_CAP>,
    pub blockers_for_king: [Bitboard; 2],
    pub pinners_for_king: [Bitboard; 2],
    pub check_squares: [Bitboard; 8],
}

impl StateInfo {
    pub fn new() -> StateInfo {
        StateInfo {
            pawn_key: Key(0),
            material_key: Key(0),
            non_pawn_material: [Value::ZERO; 2],
            castling_rights: CastlingRight(0),
            rule50: 0,
            plies_from_null: 0,
            psq: Score::ZERO,
            ep_square: Square::NONE,
            checks_given: [0; 2],
            key: Key(0),
            checkers_bb: Bitboard(0),
            captured_piece: NO_PIECE,
            blast: ArrayVec::new(),
            blockers_for_king: [Bitboard(0); 2],
            pinners_for_king: [Bitboard(0); 2],
            check_squares: [Bitboard(0); 8],
        }
    }

    pub fn copy(&self) -> StateInfo {
        StateInfo {
            pawn_key: self.pawn_key,
            material_key: self.material_key,
            non_pawn_material: self.non_pawn_material,
            castling_rights: self.castling_rights,
            rule50: self.rule50,
            plies_from_null: self.plies_from_null,
            psq: self.psq,
            ep_square: self.ep_square,
            checks_given: self.checks_given,
            key: Key(0),
            checkers_bb: Bitboard(0),
            captured_piece: NO_PIECE,
            blast: ArrayVec::new(),
            blockers_for_king: [Bitboard(0); 2],
            pinners_for_king: [Bitboard(0); 2],
            check_squares: [Bitboard(0); 8],
        }
    }
}

pub struct Position {
    board: [Piece; 64],
    by_color_bb: [Bitboard; 2],
    by_type_bb: [Bitboard; 8],
    piece_count: [i32; 16],
    // 64 slots per piece: the Horde start position alone has 36 pawns
    piece_list: [[Square; 64]; 16],
    index: [i32; 64],
    castling_rights_mask: [CastlingRight; 64],
    castling_rook_square: [Square; 16],
    castling_path: [Bitboard; 16],
    game_ply: i32,
    side_to_move: Color,
    variant: Variant,
    chess960: bool,
    states: Vec<StateInfo>,
    pub nodes: u64,
}

const KOTH_CENTER: Bitboard =
    Bitboard((FILED_BB.0 | FILEE_BB.0) & (RANK4_BB.0 | RANK5_BB.0));

impl Position {
    pub fn new() -> Position {
        Position {
            board: [NO_PIECE; 64],
            by_color_bb: [Bitboard(0); 2],
            by_type_bb: [Bitboard(0); 8],
            piece_count: [0; 16],
            piece_list: [[Square::NONE; 64]; 16],
            index: [0; 64],
            castling_rights_mask: [CastlingRight(0); 64],
            castling_rook_square: [Square::NONE; 16],
            castling_path: [Bitboard(0); 16],
            game_ply: 0,
            side_to_move: WHITE,
            variant: CHESS_VARIANT,
            chess960: false,
            states: Vec::new(),
            nodes: 0,
        }
    }

    pub fn from_fen(fen: &str, v: Variant) -> Result<Position, FenError> {
        let mut pos = Position::new();
        pos.set(fen, v)?;
        Ok(pos)
    }

    fn st(&self) -> &StateInfo {
        self.states.last().unwrap()
    }

    fn st_mut(&mut self) -> &mut StateInfo {
        self.states.last_mut().unwrap()
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn empty(&self, s: Square) -> bool {
        self.board[s.0 as usize] == NO_PIECE
    }

    pub fn piece_on(&self, s: Square) -> Piece {
        self.board[s.0 as usize]
    }

    pub fn moved_piece(&self, m: Move) -> Piece {
        self.board[m.from().0 as usize]
    }

    pub fn pieces(&self) -> Bitboard {
        self.by_type_bb[ALL_PIECES.0 as usize]
    }

    pub fn pieces_p(&self, pt: PieceType) -> Bitboard {
        self.by_type_bb[pt.0 as usize]
    }

    pub fn pieces_pp(&self, pt1: PieceType, pt2: PieceType) -> Bitboard {
        self.pieces_p(pt1) | self.pieces_p(pt2)
    }

    pub fn pieces_c(&self, c: Color) -> Bitboard {
        self.by_color_bb[c.0 as usize]
    }

    pub fn pieces_cp(&self, c: Color, pt: PieceType) -> Bitboard {
        self.pieces_c(c) & self.pieces_p(pt)
    }

    pub fn pieces_cpp(
        &self, c: Color, pt1: PieceType, pt2: PieceType,
    ) -> Bitboard {
        self.pieces_c(c) & self.pieces_pp(pt1, pt2)
    }

    pub fn count(&self, c: Color, pt: PieceType) -> i32 {
        self.piece_count[Piece::make(c, pt).0 as usize]
    }

    pub fn squares(&self, c: Color, pt: PieceType) -> &[Square] {
        &self.piece_list[Piece::make(c, pt).0 as usize]
    }

    pub fn square_list(&self, c: Color, pt: PieceType) -> SquareList {
        SquareList::construct(self.squares(c, pt))
    }

    // square() returns the first entry of the piece list. For kings this is
    // the king square, or Square::NONE in variants where the king may be
    // absent (Horde white, Atomic after an explosion, Antichess).
    pub fn square(&self, c: Color, pt: PieceType) -> Square {
        self.squares(c, pt)[0]
    }

    pub fn ep_square(&self) -> Square {
        self.st().ep_square
    }

    pub fn has_castling_right(&self, cr: CastlingRight) -> bool {
        self.st().castling_rights & cr != 0
    }

    pub fn castling_rights(&self, c: Color) -> CastlingRight {
        self.st().castling_rights & CastlingRight(3 << (2 * c.0))
    }

    pub fn can_castle(&self, c: Color) -> bool {
        self.castling_rights(c) != 0
    }

    pub fn castling_impeded(&self, cr: CastlingRight) -> bool {
        self.pieces() & self.castling_path[cr.0 as usize] != Bitboard(0)
    }

    pub fn castling_rook_square(&self, cr: CastlingRight) -> Square {
        self.castling_rook_square[cr.0 as usize]
    }

    pub fn attacks_from_pawn(&self, s: Square, c: Color) -> Bitboard {
        pawn_attacks(c, s)
    }

    pub fn attacks_from(&self, pt: PieceType, s: Square) -> Bitboard {
        debug_assert!(pt != PAWN);
        match pt {
            BISHOP | ROOK => attacks_bb(pt, s, self.pieces()),
            QUEEN => self.attacks_from(ROOK, s) | self.attacks_from(BISHOP, s),
            _ => pseudo_attacks(pt, s),
        }
    }

    pub fn attackers_to_occ(&self, s: Square, occ: Bitboard) -> Bitboard {
          (self.attacks_from_pawn(s, BLACK) & self.pieces_cp(WHITE, PAWN))
        | (self.attacks_from_pawn(s, WHITE) & self.pieces_cp(BLACK, PAWN))
        | (self.attacks_from(KNIGHT, s)     & self.pieces_p(KNIGHT))
        | (     attacks_bb(ROOK, s, occ)    & self.pieces_pp(ROOK, QUEEN))
        | (     attacks_bb(BISHOP, s, occ)  & self.pieces_pp(BISHOP, QUEEN))
        | (self.attacks_from(KING, s)       & self.pieces_p(KING))
    }

    pub fn attackers_to(&self, s: Square) -> Bitboard {
        self.attackers_to_occ(s, self.by_type_bb[ALL_PIECES.0 as usize])
    }

    pub fn checkers(&self) -> Bitboard {
        self.st().checkers_bb
    }

    pub fn blockers_for_king(&self, c: Color) -> Bitboard {
        self.st().blockers_for_king[c.0 as usize]
    }

    pub fn pinners_for_king(&self, c: Color) -> Bitboard {
        self.st().pinners_for_king[c.0 as usize]
    }

    pub fn discovered_check_candidates(&self) -> Bitboard {
        self.blockers_for_king(!self.side_to_move)
        & self.pieces_c(self.side_to_move)
    }

    pub fn pinned_pieces(&self, c: Color) -> Bitboard {
        self.blockers_for_king(c) & self.pieces_c(c)
    }

    pub fn check_squares(&self, pt: PieceType) -> Bitboard {
        self.st().check_squares[pt.0 as usize]
    }

    pub fn key(&self) -> Key {
        self.st().key
    }

    pub fn pawn_key(&self) -> Key {
        self.st().pawn_key
    }

    pub fn material_key(&self) -> Key {
        self.st().material_key
    }

    pub fn psq_score(&self) -> Score {
        self.st().psq
    }

    pub fn non_pawn_material_c(&self, c: Color) -> Value {
        self.st().non_pawn_material[c.0 as usize]
    }

    pub fn non_pawn_material(&self) -> Value {
        self.non_pawn_material_c(WHITE) + self.non_pawn_material_c(BLACK)
    }

    pub fn game_ply(&self) -> i32 {
        self.game_ply
    }

    pub fn rule50_count(&self) -> i32 {
        self.st().rule50
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn is_three_check(&self) -> bool {
        self.variant.has(THREECHECK_VARIANT)
    }

    pub fn is_koth(&self) -> bool {
        self.variant.has(KOTH_VARIANT)
    }

    pub fn is_race(&self) -> bool {
        self.variant.has(RACE_VARIANT)
    }

    pub fn is_horde(&self) -> bool {
        self.variant.has(HORDE_VARIANT)
    }

    pub fn is_atomic(&self) -> bool {
        self.variant.has(ATOMIC_VARIANT)
    }

    pub fn is_anti(&self) -> bool {
        self.variant.has(ANTI_VARIANT)
    }

    // Variant end-of-game predicates, all from the point of view of the
    // side to move.

    pub fn checks_given(&self, c: Color) -> i32 {
        self.st().checks_given[c.0 as usize]
    }

    pub fn is_three_check_win(&self) -> bool {
        self.checks_given(self.side_to_move) >= 3
    }

    pub fn is_three_check_loss(&self) -> bool {
        self.checks_given(!self.side_to_move) >= 3
    }

    pub fn is_koth_win(&self) -> bool {
        KOTH_CENTER & self.square(self.side_to_move, KING) != 0
    }

    pub fn is_koth_loss(&self) -> bool {
        KOTH_CENTER & self.square(!self.side_to_move, KING) != 0
    }

    pub fn is_race_draw(&self) -> bool {
        self.square(WHITE, KING).rank() == RANK_8
        && self.square(BLACK, KING).rank() == RANK_8
    }

    pub fn is_race_win(&self) -> bool {
        self.square(self.side_to_move, KING).rank() == RANK_8
        && self.square(!self.side_to_move, KING).rank() != RANK_8
    }

    pub fn is_race_loss(&self) -> bool {
        self.square(self.side_to_move, KING).rank() != RANK_8
        && self.square(!self.side_to_move, KING).rank() == RANK_8
    }

    pub fn is_horde_loss(&self) -> bool {
        self.pieces_c(WHITE) == 0
    }

    pub fn is_anti_win(&self) -> bool {
        self.count(self.side_to_move, ALL_PIECES) == 0
    }

    pub fn is_anti_loss(&self) -> bool {
        self.count(!self.side_to_move, ALL_PIECES) == 0
    }

    pub fn is_atomic_win(&self) -> bool {
        self.count(!self.side_to_move, KING) == 0
    }

    pub fn is_atomic_loss(&self) -> bool {
        self.count(self.side_to_move, KING) == 0
    }

    pub fn capture(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        (!self.empty(m.to()) && m.move_type() != CASTLING)
        || m.move_type() == ENPASSANT
    }

    pub fn capture_or_promotion(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        if m.move_type() != NORMAL {
            m.move_type() != CASTLING
        } else {
            !self.empty(m.to())
        }
    }

    pub fn captured_piece(&self) -> Piece {
        self.st().captured_piece
    }

    pub const PIECE_TO_CHAR: &'static str = " PNBRQK  pnbrqk";

    // set() initializes the position object with the given FEN string and
    // variant. Malformed input is reported as a FenError; the position must
    // not be used afterwards.

    pub fn set(&mut self, fen_str: &str, v: Variant) -> Result<(), FenError> {
        for c in 0..2 {
            self.by_color_bb[c] = Bitboard(0);
        }
        for t in 0..8 {
            self.by_type_bb[t] = Bitboard(0);
        }
        for i in 0..16 {
            self.piece_count[i] = 0;
            self.castling_path[i] = Bitboard(0);
            self.castling_rook_square[i] = Square::NONE;
            for j in 0..64 {
                self.piece_list[i][j] = Square::NONE;
            }
        }
        for i in 0..64 {
            self.board[i] = NO_PIECE;
            self.castling_rights_mask[i] = CastlingRight(0);
        }
        self.states.truncate(0);
        self.states.push(StateInfo::new());
        self.variant = v;
        self.chess960 = v.has(CHESS960_VARIANT);
        self.nodes = 0;

        let mut iter = fen_str.split_whitespace();

        // 1. Piece placement
        let pieces = iter.next().ok_or(FenError::Missing("placement"))?;
        let mut sq = Square::A8;
        for c in pieces.chars() {
            if let Some(d) = c.to_digit(10) {
                if d < 1 || d > 8 {
                    return Err(FenError::PiecePlacement);
                }
                sq += (d as i32) * EAST; // Advance the given number of files
            } else if c == '/' {
                sq += 2 * SOUTH;
            } else if let Some(idx) = Position::PIECE_TO_CHAR.find(c) {
                if !sq.is_ok() {
                    return Err(FenError::PiecePlacement);
                }
                self.put_piece(Piece(idx as u32), sq);
                sq += EAST;
            } else {
                return Err(FenError::PiecePlacement);
            }
        }

        self.check_king_count()?;

        // 2. Active color
        let color = iter.next().ok_or(FenError::Missing("active color"))?;
        self.side_to_move = match color {
            "w" => WHITE,
            "b" => BLACK,
            _ => return Err(FenError::ActiveColor),
        };

        // 3. Castling availability. Compatible with 3 standards: Normal FEN
        // standard, Shredder-FEN that uses the letters of the columns on
        // which the rooks began the game instead of KQkq and also X-FEN
        // standard that, in case of Chess960, if an inner rook is associated
        // with the castling right, the castling tag is replaced by the file
        // letter of the involved rook, as for the Shredder-FEN.
        let castling = iter.next().ok_or(FenError::Missing("castling"))?;
        if castling != "-" {
            for c in castling.chars() {
                let color = if c.is_lowercase() { BLACK } else { WHITE };
                let rank = relative_rank(color, RANK_1);
                let ksq = self.square(color, KING);
                if ksq == Square::NONE || ksq.rank() != rank {
                    continue;
                }
                let rook = Piece::make(color, ROOK);
                let side = c.to_uppercase().next().unwrap();
                let mut rsq;
                if side == 'K' {
                    rsq = Square::H1.relative(color);
                    while rsq != ksq && self.piece_on(rsq) != rook {
                        rsq += WEST;
                    }
                } else if side == 'Q' {
                    rsq = Square::A1.relative(color);
                    while rsq != ksq && self.piece_on(rsq) != rook {
                        rsq += EAST;
                    }
                } else if side >= 'A' && side <= 'H' {
                    let file = side.to_digit(18).unwrap() - 10;
                    rsq = Square::make(file, rank);
                } else {
                    continue;
                }
                if rsq != ksq && self.piece_on(rsq) == rook {
                    self.set_castling_right(color, rsq);
                }
            }
        }

        // 4. En passant square. Ignore if no pawn capture is possible
        self.st_mut().ep_square = Square::NONE;
        if let Some(enpassant) = iter.next() {
            let mut chars = enpassant.chars();
            let file = chars.next().and_then(|c| c.to_digit(18));
            let rank = chars.next().and_then(|c| c.to_digit(10));
            if let (Some(f), Some(r)) = (file, rank) {
                let us = self.side_to_move;
                let expected = if us == WHITE { 6 } else { 3 };
                if f >= 10 && f <= 17 && r == expected {
                    let ep_sq = Square::make(f - 10, r - 1);
                    let up = pawn_push(us);
                    if self.attackers_to(ep_sq)
                            & self.pieces_cp(us, PAWN) != 0
                        && self.pieces() & ep_sq == 0
                        && self.pieces() & (ep_sq + up) == 0
                        && self.pieces_cp(!us, PAWN) & (ep_sq - up) != 0
                    {
                        self.st_mut().ep_square = ep_sq;
                    }
                }
            }
        }

        // 5-6. Halfmove clock and fullmove number
        if let Some(halfmove) = iter.next() {
            self.st_mut().rule50 =
                halfmove.parse::<i32>().map_err(|_| FenError::MoveCounters)?;
        } else {
            self.st_mut().rule50 = 0;
        }

        // Convert from fullmove starting from 1 to game_ply starting from 0.
        // Handle also common incorrect FEN with fullmove = 0.
        if let Some(fullmove) = iter.next() {
            let fullmove =
                fullmove.parse::<i32>().map_err(|_| FenError::MoveCounters)?;
            self.game_ply = std::cmp::max(2 * (fullmove - 1), 0);
        } else {
            self.game_ply = 0;
        }
        if self.side_to_move == BLACK {
            self.game_ply += 1;
        }

        // 7. Checks given, for Three-Check positions
        if self.is_three_check() {
            if let Some(checks) = iter.next() {
                let digits: Vec<i32> = checks
                    .split('+')
                    .skip(1)
                    .map(|t| t.parse::<i32>().map_err(|_| FenError::CheckCounters))
                    .collect::<Result<_, _>>()?;
                if digits.len() != 2
                    || digits.iter().any(|&n| n < 0 || n > 3)
                {
                    return Err(FenError::CheckCounters);
                }
                self.st_mut().checks_given = [digits[0], digits[1]];
            }
        }

        self.set_state();

        debug_assert!(self.pos_is_ok());
        Ok(())
    }

    // The FEN parser is otherwise lenient, but a position with the wrong
    // number of kings for its variant would break the king-square caches,
    // so it is rejected up front.

    fn check_king_count(&self) -> Result<(), FenError> {
        let wk = popcount(self.pieces_cp(WHITE, KING));
        let bk = popcount(self.pieces_cp(BLACK, KING));
        let ok = if self.is_anti() {
            true
        } else if self.is_horde() {
            wk == 0 && bk == 1
        } else {
            wk == 1 && bk == 1
        };
        if ok { Ok(()) } else { Err(FenError::KingCount) }
    }

    // set_castling_right() is a helper function used to set castling rights
    // given the corresponding color and the rook starting square.

    fn set_castling_right(&mut self, c: Color, rfrom: Square) {
        let kfrom = self.square(c, KING);
        let cs = if kfrom < rfrom { CastlingSide::KING }
            else { CastlingSide::QUEEN };
        let cr = c | cs;

        // Any non-corner rook or off-center king marks the position as
        // Chess960.
        if kfrom.file() != FILE_E
            || (rfrom.file() != FILE_A && rfrom.file() != FILE_H)
        {
            self.chess960 = true;
        }

        self.st_mut().castling_rights |= cr;
        self.castling_rights_mask[kfrom.0 as usize] |= cr;
        self.castling_rights_mask[rfrom.0 as usize] |= cr;
        self.castling_rook_square[cr.0 as usize] = rfrom;

        let kto = relative_square(c,
            if cs == CastlingSide::KING { Square::G1 } else { Square::C1 });
        let rto = relative_square(c,
            if cs == CastlingSide::KING { Square::F1 } else { Square::D1 });

        let mut s = std::cmp::min(rfrom, rto);
        while s <= std::cmp::max(rfrom, rto) {
            if s != kfrom && s != rfrom {
                self.castling_path[cr.0 as usize] |= s;
            }
            s += EAST;
        }

        let mut s = std::cmp::min(kfrom, kto);
        while s <= std::cmp::max(kfrom, kto) {
            if s != kfrom && s != rfrom {
                self.castling_path[cr.0 as usize] |= s;
            }
            s += EAST;
        }
    }

    // set_check_info() sets king attacks to detect if a move gives check

    fn set_check_info(&mut self) {
        let mut pinners = Bitboard(0);
        self.st_mut().blockers_for_king[WHITE.0 as usize] =
            self.slider_blockers(self.pieces_c(BLACK),
                self.square(WHITE, KING), &mut pinners);
        self.st_mut().pinners_for_king[WHITE.0 as usize] = pinners;
        self.st_mut().blockers_for_king[BLACK.0 as usize] =
            self.slider_blockers(self.pieces_c(WHITE),
                self.square(BLACK, KING), &mut pinners);
        self.st_mut().pinners_for_king[BLACK.0 as usize] = pinners;

        let ksq = self.square(!self.side_to_move, KING);

        // Variants without a royal king have no check squares at all.
        if self.is_anti() || ksq == Square::NONE {
            for pt in 0..8 {
                self.st_mut().check_squares[pt] = Bitboard(0);
            }
            return;
        }

        self.st_mut().check_squares[PAWN.0 as usize] =
            self.attacks_from_pawn(ksq, !self.side_to_move);
        self.st_mut().check_squares[KNIGHT.0 as usize] =
            self.attacks_from(KNIGHT, ksq);
        self.st_mut().check_squares[BISHOP.0 as usize] =
            self.attacks_from(BISHOP, ksq);
        self.st_mut().check_squares[ROOK.0 as usize] =
            self.attacks_from(ROOK, ksq);
        self.st_mut().check_squares[QUEEN.0 as usize] =
            self.st().check_squares[BISHOP.0 as usize]
            | self.st().check_squares[ROOK.0 as usize];
        self.st_mut().check_squares[KING.0 as usize] = Bitboard(0);
    }

    // checkers_for_state() computes the checkers bitboard the variant way.
    // In Racing Kings the slot doubles as the "opponent reached the eighth
    // rank" marker.

    fn checkers_for_state(&self) -> Bitboard {
        let us = self.side_to_move;
        if self.is_race() {
            return if self.square(us, KING).rank() == RANK_8 {
                Bitboard(0)
            } else {
                RANK8_BB & self.square(!us, KING)
            };
        }
        if self.is_anti() {
            return Bitboard(0);
        }
        let ksq = self.square(us, KING);
        if ksq == Square::NONE {
            return Bitboard(0);
        }
        if self.is_atomic() {
            let their_ksq = self.square(!us, KING);
            if their_ksq != Square::NONE
                && pseudo_attacks(KING, ksq) & their_ksq != 0
            {
                return Bitboard(0);
            }
        }
        self.attackers_to(ksq) & self.pieces_c(!us)
    }

    // set_state() computes the hash keys of the position, and other data
    // that once computed is updated incrementally as moves are made.
    // The function is used only when a new position is set up, and to verify
    // the correctness of the StateInfo data when running in debug mode.

    fn set_state(&mut self) {
        // Seed the keys with the variant tag so equal boards in different
        // variants never hash alike.
        let vkey = Key(self.variant.0 as u64);
        self.st_mut().key = vkey;
        self.st_mut().material_key = vkey;
        self.st_mut().pawn_key = zobrist::no_pawns() ^ vkey;
        self.st_mut().non_pawn_material[WHITE.0 as usize] = Value::ZERO;
        self.st_mut().non_pawn_material[BLACK.0 as usize] = Value::ZERO;
        self.st_mut().psq = Score::ZERO;
        self.st_mut().checkers_bb = self.checkers_for_state();

        self.set_check_info();

        for s in self.pieces() {
            let pc = self.piece_on(s);
            self.st_mut().key ^= zobrist::psq(pc, s);
            self.st_mut().psq += psqt::psq(pc, s);
        }

        if self.st().ep_square != Square::NONE {
            let k = zobrist::enpassant(self.st().ep_square.file());
            self.st_mut().key ^= k;
        }

        if self.side_to_move == BLACK {
            self.st_mut().key ^= zobrist::side();
        }

        let k = zobrist::castling(self.st().castling_rights);
        self.st_mut().key ^= k;

        for s in self.pieces_p(PAWN) {
            let k = zobrist::psq(self.piece_on(s), s);
            self.st_mut().pawn_key ^= k;
        }

        for c in WHITE.take(2) {
            for pt in 2..6 {
                let pc = Piece::make(c, PieceType(pt));
                let v = self.count(c, PieceType(pt)) * piece_value(MG, pc);
                self.st_mut().non_pawn_material[c.0 as usize] += v;
            }

            for pt in 1..7 {
                let pc = Piece::make(c, PieceType(pt));
                for cnt in 0..self.count(c, PieceType(pt)) {
                    self.st_mut().material_key ^= zobrist::material(pc, cnt);
                }
            }
        }

        if self.is_three_check() {
            for c in WHITE.take(2) {
                for n in 1..=self.st().checks_given[c.0 as usize] {
                    self.st_mut().key ^= zobrist::checks(c, n);
                }
            }
        }
    }

    // fen() returns a FEN representation of the position. In case of
    // Chess960 the Shredder-FEN notation is used.

    pub fn fen(&self) -> String {
        let mut ss = String::new();

        for r in (0..8).rev() {
            let mut f = 0;
            while f < 8 {
                let mut empty_cnt = 0u8;
                while f < 8 && self.empty(Square::make(f, r)) {
                    empty_cnt += 1;
                    f += 1;
                }
                if empty_cnt > 0 {
                    ss.push((48u8 + empty_cnt) as char);
                }
                if f < 8 {
                    let c = Position::PIECE_TO_CHAR.chars()
                        .nth(self.piece_on(Square::make(f, r)).0 as usize)
                        .unwrap();
                    ss.push(c);
                    f += 1;
                }
            }
            if r > 0 {
                ss.push('/');
            }
        }

        ss.push_str(if self.side_to_move == WHITE { " w " } else { " b " });

        self.castle_helper(&mut ss, WHITE_OO, 'K');
        self.castle_helper(&mut ss, WHITE_OOO, 'Q');
        self.castle_helper(&mut ss, BLACK_OO, 'k');
        self.castle_helper(&mut ss, BLACK_OOO, 'q');

        if !self.has_castling_right(ANY_CASTLING) {
            ss.push('-');
        }

        if self.ep_square() == Square::NONE {
            ss.push_str(" - ");
        } else {
            ss.push(' ');
            ss.push_str(&self.ep_square().to_string());
            ss.push(' ');
        }

        ss.push_str(&self.rule50_count().to_string());
        ss.push(' ');
        ss.push_str(
            &(1 + (self.game_ply - (self.side_to_move == BLACK) as i32) / 2)
                .to_string());

        if self.is_three_check() {
            ss.push_str(&format!(" +{}+{}",
                self.checks_given(WHITE), self.checks_given(BLACK)));
        }

        ss
    }

    fn castle_helper(&self, ss: &mut String, cr: CastlingRight, c: char) {
        if !self.has_castling_right(cr) {
            return;
        }

        if !self.chess960 {
            ss.push(c);
        } else {
            let f = self.castling_rook_square(cr).file();
            let r = self.castling_rook_square(cr).rank();
            let mut c = 65 + f;
            if r == RANK_8 {
                c += 32;
            }
            ss.push((c as u8) as char);
        }
    }

    // game_phase() interpolates total non-pawn material between the endgame
    // and midgame limits. Horde weighs the pawnless side twice, Atomic the
    // whole board.

    pub fn game_phase(&self) -> Phase {
        let mut npm = self.non_pawn_material();
        if self.is_horde() {
            npm = self.non_pawn_material_c(BLACK)
                + self.non_pawn_material_c(BLACK);
        }
        if self.is_atomic() {
            npm += npm;
        }

        let npm = std::cmp::max(ENDGAME_LIMIT, std::cmp::min(npm, MIDGAME_LIMIT));

        ((npm - ENDGAME_LIMIT).0 * PHASE_MIDGAME)
            / (MIDGAME_LIMIT - ENDGAME_LIMIT).0
    }

    // slider_blockers() returns a bitboard of all the pieces (both colors)
    // that are blocking attacks on the square 's' from 'sliders'. A piece
    // blocks a slider if removing that piece from the board would result
    // in a position where square 's' is attacked. For example, a king attack
    // blocking piece can be either a pinned or a discovered check piece,
    // depending on whether its color is the opposite of or the same as the
    // color of the slider.

    pub fn slider_blockers(
        &self,
        sliders: Bitboard,
        s: Square,
        pinners: &mut Bitboard,
    ) -> Bitboard {
        let mut result = Bitboard(0);
        *pinners = Bitboard(0);

        // Variants can leave a side without a king
        if s == Square::NONE {
            return result;
        }

        // Snipers are sliders that attack 's' when a piece is removed
        let snipers =
            ((pseudo_attacks(ROOK, s) & self.pieces_pp(QUEEN, ROOK))
                | (pseudo_attacks(BISHOP, s) & self.pieces_pp(QUEEN, BISHOP)))
            & sliders;

        for sniper_sq in snipers {
            let b = between_bb(s, sniper_sq) & self.pieces();

            if b != 0 && !more_than_one(b) {
                result |= b;
                if b & self.pieces_c(self.piece_on(s).color()) != 0 {
                    *pinners |= sniper_sq;
                }
            }
        }
        result
    }

    // legal() tests whether a pseudo-legal move is legal

    pub fn legal(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());

        let us = self.side_to_move;
        let from = m.from();
        let to = m.to();

        debug_assert!(self.moved_piece(m).color() == us);

        // Captures being forced is the move generator's business; with no
        // check concept every generated move is playable.
        if self.is_anti() {
            return true;
        }

        // Checking moves lose on the spot in Racing Kings
        if self.is_race() && self.gives_check(m) {
            return false;
        }

        // All pseudo-legal moves by the horde are legal
        if self.is_horde() && self.square(us, KING) == Square::NONE {
            return true;
        }

        if self.is_atomic() {
            let ksq = self.square(us, KING);
            let their_ksq = self.square(!us, KING);
            if ksq == Square::NONE || their_ksq == Square::NONE {
                return true; // Decided position, gated by pseudo_legal()
            }
            // Captures next to the own king blow it up
            if self.capture(m) && pseudo_attacks(KING, to) & ksq != 0 {
                return false;
            }
            if self.piece_on(from).piece_type() != KING {
                // Adjacent kings switch checks off entirely
                if pseudo_attacks(KING, their_ksq) & ksq != 0 {
                    return true;
                }
                if self.capture(m) {
                    let capsq = if m.move_type() == ENPASSANT {
                        Square::make(to.file(), from.rank())
                    } else {
                        to
                    };
                    let blast = pseudo_attacks(KING, to)
                        & (self.pieces() ^ self.pieces_p(PAWN));
                    if blast & their_ksq != 0 {
                        return true; // The enemy king is destroyed as well
                    }
                    let b = self.pieces() ^ ((blast | capsq) | from);
                    if self.checkers() & b != 0 {
                        return false;
                    }
                    if attacks_bb(ROOK, ksq, b)
                            & self.pieces_cpp(!us, QUEEN, ROOK) & b != 0
                        || attacks_bb(BISHOP, ksq, b)
                            & self.pieces_cpp(!us, QUEEN, BISHOP) & b != 0
                    {
                        return false;
                    }
                    return true;
                }
            } else if pseudo_attacks(KING, their_ksq) & to != 0 {
                return true; // Moving beside the enemy king shields us
            }
        }

        // En passant captures are a tricky special case. Because they are
        // uncommon, we do it simply by testing whether the king is attacked
        // after the move is made.
        if m.move_type() == ENPASSANT {
            let ksq = self.square(us, KING);
            let capsq = to - pawn_push(us);
            let occupied = (self.pieces() ^ from ^ capsq) | to;

            debug_assert!(to == self.ep_square());
            debug_assert!(self.moved_piece(m) == Piece::make(us, PAWN));
            debug_assert!(self.piece_on(capsq) == Piece::make(!us, PAWN));
            debug_assert!(self.piece_on(to) == NO_PIECE);

            return
                attacks_bb(ROOK, ksq, occupied)
                    & self.pieces_cpp(!us, QUEEN, ROOK) == 0
                && attacks_bb(BISHOP, ksq, occupied)
                    & self.pieces_cpp(!us, QUEEN, BISHOP) == 0;
        }

        // An atomic king stepping out of the enemy king's shadow must not
        // land on a square attacked through the vacated one.
        if self.is_atomic()
            && self.piece_on(from).piece_type() == KING
            && m.move_type() != CASTLING
        {
            let their_ksq = self.square(!us, KING);
            if pseudo_attacks(KING, their_ksq) & from != 0
                && pseudo_attacks(KING, their_ksq) & to == 0
            {
                if self.attackers_to(to)
                    & self.pieces_cpp(!us, KNIGHT, PAWN) != 0
                {
                    return false;
                }
                let occupied = (self.pieces() ^ from) | to;
                return attacks_bb(ROOK, to, occupied)
                        & self.pieces_cpp(!us, QUEEN, ROOK) == 0
                    && attacks_bb(BISHOP, to, occupied)
                        & self.pieces_cpp(!us, QUEEN, BISHOP) == 0;
            }
        }

        // If the moving piece is a king, check whether the destination
        // square is attacked by the opponent. Castling moves are checked
        // for legality during move generation.
        if self.piece_on(from).piece_type() == KING {
            return m.move_type() == CASTLING
                || self.attackers_to(to) & self.pieces_c(!us) == 0;
        }

        // A non-king move is legal if and only if it is not pinned or it
        // is moving along the ray towards or away from the king.
        self.pinned_pieces(us) & from == 0
        || aligned(from, to, self.square(us, KING))
    }

    // pseudo_legal() takes a random move and tests whether the move is
    // pseudo legal. It is used to validate moves from the TT that can be
    // corrupted due to SMP concurrent access or hash position key aliasing.

    pub fn pseudo_legal(&self, m: Move) -> bool {
        let us = self.side_to_move;
        let from = m.from();
        let to = m.to();
        let pc = self.moved_piece(m);

        // If the game is already decided, further moves are illegal
        if self.is_koth() && (self.is_koth_win() || self.is_koth_loss()) {
            return false;
        }
        if self.is_race()
            && (self.is_race_draw() || self.is_race_win()
                || self.is_race_loss())
        {
            return false;
        }
        if self.is_horde() && self.is_horde_loss() {
            return false;
        }
        if self.is_anti() && (self.is_anti_win() || self.is_anti_loss()) {
            return false;
        }
        if self.is_three_check()
            && (self.is_three_check_win() || self.is_three_check_loss())
        {
            return false;
        }

        if self.is_atomic() {
            if self.is_atomic_win() || self.is_atomic_loss() {
                return false;
            }
            if pc == NO_PIECE || pc.color() != us {
                return false;
            }
            if self.capture(m) {
                if pc.piece_type() == KING {
                    return false;
                }
                let ksq = self.square(us, KING);
                if self.pieces_c(us) & to != 0
                    || pseudo_attacks(KING, ksq) & to != 0
                {
                    return false;
                }
                if pseudo_attacks(KING, self.square(!us, KING)) & ksq == 0 {
                    // Illegal pawn capture generated by killer move heuristic
                    if pc.piece_type() == PAWN && from.file() == to.file() {
                        return false;
                    }
                    let capsq = if m.move_type() == ENPASSANT {
                        Square::make(to.file(), from.rank())
                    } else {
                        to
                    };
                    let blast = pseudo_attacks(KING, to)
                        & (self.pieces() ^ self.pieces_p(PAWN));
                    if blast & self.square(!us, KING) != 0 {
                        return true;
                    }
                    let b = self.pieces() ^ ((blast | capsq) | from);
                    if self.checkers() & b != 0 {
                        return false;
                    }
                    if attacks_bb(ROOK, ksq, b)
                            & self.pieces_cpp(!us, QUEEN, ROOK) & b != 0
                        || attacks_bb(BISHOP, ksq, b)
                            & self.pieces_cpp(!us, QUEEN, BISHOP) & b != 0
                    {
                        return false;
                    }
                }
            }
        }

        // Use a slower but simpler function for uncommon cases
        if m.move_type() != NORMAL {
            return MoveList::new(self, GenType::Legal).contains(m);
        }

        // It is not a promotion, so promotion piece must be empty
        if m.promotion_type() != KNIGHT {
            return false;
        }

        // If the 'from' square is not occupied by a piece belonging to the
        // side to move, the move is obviously not legal.
        if pc == NO_PIECE || pc.color() != us {
            return false;
        }

        // The destination square cannot be occupied by a friendly piece
        if self.pieces_c(us) & to != 0 {
            return false;
        }

        // Handle the special case of a pawn move
        if pc.piece_type() == PAWN {
            // We have already handled promotion moves, so destination
            // cannot be on the 8th/1st rank.
            if to.rank() == relative_rank(us, RANK_8) {
                return false;
            }

            let double_push_rank = if self.is_horde() && us == WHITE {
                from.rank() == RANK_1 || from.rank() == RANK_2
            } else {
                from.rank() == relative_rank(us, RANK_2)
            };

            if self.attacks_from_pawn(from, us) & self.pieces_c(!us) & to == 0
                && !((from + pawn_push(us) == to) && self.empty(to))
                && !(  from + 2 * pawn_push(us) == to
                    && double_push_rank
                    && self.empty(to)
                    && self.empty(to - pawn_push(us)))
            {
                return false;
            }
        } else if self.attacks_from(pc.piece_type(), from) & to == 0 {
            return false;
        }

        // Adjacent kings make every atomic pseudo-move playable as far as
        // check is concerned.
        if self.is_atomic() {
            let shield = if pc.piece_type() == KING {
                to
            } else {
                self.square(us, KING)
            };
            if pseudo_attacks(KING, self.square(!us, KING)) & shield != 0 {
                return true;
            }
        }

        // Evasions generator already takes care of avoiding certain kinds of
        // illegal moves and legal() relies on this. We therefore have to take
        // care that the same kind of moves are filtered out here.
        if self.checkers() != 0 {
            if pc.piece_type() != KING {
                // Double check? In this case a king move is required
                if more_than_one(self.checkers()) {
                    return false;
                }

                // Our move must be a blocking evasion or a capture of the
                // checking piece
                if (between_bb(lsb(self.checkers()), self.square(us, KING))
                        | self.checkers())
                    & to == 0
                {
                    return false;
                }
            }
            // In case of king moves under check we have to remove king so as
            // to catch invalid moves like b1a1 when opposite queen is on c1.
            else if self.attackers_to_occ(to, self.pieces() ^ from)
                    & self.pieces_c(!us) != 0
            {
                return false;
            }
        }

        true
    }

    // gives_check() tests whether a pseudo-legal move gives a check

    pub fn gives_check(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        debug_assert!(self.moved_piece(m).color() == self.side_to_move);

        let us = self.side_to_move;
        let from = m.from();
        let to = m.to();

        if self.is_anti() {
            return false;
        }

        let ksq = self.square(!us, KING);
        if ksq == Square::NONE {
            return false;
        }

        if self.is_atomic() {
            // If kings are adjacent, there is no check.
            // If kings were adjacent, there may be direct checks.
            if self.piece_on(from).piece_type() == KING {
                if pseudo_attacks(KING, ksq) & to != 0 {
                    return false;
                } else if pseudo_attacks(KING, ksq) & from != 0 {
                    if self.attackers_to(ksq)
                        & self.pieces_cpp(us, KNIGHT, PAWN) != 0
                    {
                        return true;
                    }
                    let occupied = (self.pieces() ^ from) | to;
                    return attacks_bb(ROOK, ksq, occupied)
                            & self.pieces_cpp(us, QUEEN, ROOK) != 0
                        || attacks_bb(BISHOP, ksq, occupied)
                            & self.pieces_cpp(us, QUEEN, BISHOP) != 0;
                }
            } else if pseudo_attacks(KING, ksq) & self.square(us, KING) != 0 {
                return false;
            }
            if self.capture(m) {
                // Do blasted pieces discover checks?
                let capsq = if m.move_type() == ENPASSANT {
                    Square::make(to.file(), from.rank())
                } else {
                    to
                };
                let blast = pseudo_attacks(KING, to)
                    & (self.pieces() ^ self.pieces_p(PAWN));
                if blast & ksq != 0 {
                    return false; // Variant ending
                }
                let b = self.pieces() ^ ((blast | capsq) | from);

                return attacks_bb(ROOK, ksq, b)
                        & self.pieces_cpp(us, QUEEN, ROOK) & b != 0
                    || attacks_bb(BISHOP, ksq, b)
                        & self.pieces_cpp(us, QUEEN, BISHOP) & b != 0;
            }
        }

        // Is there a direct check?
        if self.st().check_squares
            [self.piece_on(from).piece_type().0 as usize] & to != 0
        {
            return true;
        }

        // Is there a discovered check?
        if self.discovered_check_candidates() & from != 0
            && !aligned(from, to, ksq)
        {
            return true;
        }

        match m.move_type() {

            NORMAL => false,

            PROMOTION => {
                attacks_bb(m.promotion_type(), to, self.pieces() ^ from)
                & ksq != 0
            }

            // En passant capture with check? We have already handled the
            // case of direct checks and ordinary discovered check, so the
            // only case we need to handle is the unusual case of a
            // discovered check through the captured pawn.
            ENPASSANT => {
                let capsq = Square::make(to.file(), from.rank());
                let b = (self.pieces() ^ from ^ capsq) | to;

                (attacks_bb(ROOK, ksq, b)
                    & self.pieces_cpp(us, QUEEN, ROOK))
                | (attacks_bb(BISHOP, ksq, b)
                    & self.pieces_cpp(us, QUEEN, BISHOP)) != 0
            }

            CASTLING => {
                let kfrom = from;
                let rfrom = to; // Castling is encoded as king captures rook
                let kto = relative_square(us,
                    if rfrom > kfrom { Square::G1 } else { Square::C1 });
                let rto = relative_square(us,
                    if rfrom > kfrom { Square::F1 } else { Square::D1 });

                (pseudo_attacks(ROOK, rto) & ksq) != 0
                && (attacks_bb(ROOK, rto,
                        (self.pieces() ^ kfrom ^ rfrom) | rto | kto)
                    & ksq) != 0
            }

            _ => {
                debug_assert!(false);
                false
            }
        }
    }

    // do_move() makes a move and saves all information necessary to restore
    // the position in a fresh StateInfo pushed on the state stack. The move
    // is assumed to be legal. Pseudo-legal moves should be filtered out
    // before this function is called. The gives_check hint is trusted.

    pub fn do_move(&mut self, m: Move, gives_check: bool) {
        debug_assert!(m.is_ok());

        self.nodes += 1;
        let mut k = self.st().key ^ zobrist::side();

        // Copy some fields of the old state to our new StateInfo object
        // except the ones which are going to be recalculated from scratch
        // anyway.
        let st_copy = self.st().copy();
        self.states.push(st_copy);

        // Increment ply counters. The rule50 field will be reset to zero
        // later on in case of a capture or a pawn move.
        self.game_ply += 1;
        self.st_mut().rule50 += 1;
        self.st_mut().plies_from_null += 1;

        let us = self.side_to_move;
        let them = !us;
        let from = m.from();
        let mut to = m.to();
        let pc = self.piece_on(from);
        let mut captured =
            if m.move_type() == ENPASSANT {
                Piece::make(them, PAWN)
            } else {
                self.piece_on(to)
            };

        debug_assert!(pc.color() == us);
        debug_assert!(
            captured == NO_PIECE
            || captured.color() ==
                if m.move_type() != CASTLING { them } else { us }
        );
        debug_assert!(self.is_anti() || captured.piece_type() != KING);

        if m.move_type() == CASTLING {
            debug_assert!(pc == Piece::make(us, KING));
            debug_assert!(captured == Piece::make(us, ROOK));

            let mut rfrom = Square::A1;
            let mut rto = Square::A1;
            self.do_castling::<True>(us, from, &mut to, &mut rfrom, &mut rto);

            self.st_mut().psq +=
                psqt::psq(captured, rto) - psqt::psq(captured, rfrom);
            k ^= zobrist::psq(captured, rfrom) ^ zobrist::psq(captured, rto);
            captured = NO_PIECE;
        }

        let atomic_capture = self.is_atomic() && captured != NO_PIECE;

        if captured != NO_PIECE {
            let mut capsq = to;

            // If the captured piece is a pawn, update pawn hash key,
            // otherwise update non-pawn material.
            if captured.piece_type() == PAWN {
                if m.move_type() == ENPASSANT {
                    capsq -= pawn_push(us);

                    debug_assert!(pc == Piece::make(us, PAWN));
                    debug_assert!(to == self.st().ep_square);
                    debug_assert!(to.relative_rank(us) == RANK_6);
                    debug_assert!(self.piece_on(to) == NO_PIECE);
                    debug_assert!(
                        self.piece_on(capsq) == Piece::make(them, PAWN)
                    );

                    self.board[capsq.0 as usize] = NO_PIECE;
                }

                self.st_mut().pawn_key ^= zobrist::psq(captured, capsq);
            } else {
                self.st_mut().non_pawn_material[them.0 as usize] -=
                    piece_value(MG, captured);
            }

            // Update board and piece lists
            self.remove_piece(captured, capsq);

            // Update material hash key
            k ^= zobrist::psq(captured, capsq);
            let mk = zobrist::material(captured,
                self.piece_count[captured.0 as usize]);
            self.st_mut().material_key ^= mk;

            // Remove the blast pieces, recording them for undo_move().
            // Pawns do not explode, the moving piece is handled below.
            if atomic_capture {
                let blast = pseudo_attacks(KING, to) & self.pieces();
                for bsq in blast {
                    if bsq == from {
                        continue;
                    }
                    let bpc = self.piece_on(bsq);
                    if bpc != NO_PIECE && bpc.piece_type() != PAWN {
                        self.st_mut().blast.push((bsq, bpc));
                        self.st_mut().non_pawn_material
                            [bpc.color().0 as usize] -= piece_value(MG, bpc);

                        self.remove_piece(bpc, bsq);

                        k ^= zobrist::psq(bpc, bsq);
                        let mk = zobrist::material(bpc,
                            self.piece_count[bpc.0 as usize]);
                        self.st_mut().material_key ^= mk;

                        self.st_mut().psq -= psqt::psq(bpc, bsq);

                        // Explosions revoke castling rights rooted on the
                        // blasted squares
                        if self.st().castling_rights != 0
                            && self.castling_rights_mask[bsq.0 as usize] != 0
                        {
                            let cr = self.castling_rights_mask[bsq.0 as usize];
                            k ^= zobrist::castling(
                                self.st().castling_rights & cr);
                            self.st_mut().castling_rights &= !cr;
                        }
                    }
                }
            }

            // Update incremental scores
            self.st_mut().psq -= psqt::psq(captured, capsq);

            // Reset rule 50 counter
            self.st_mut().rule50 = 0;
        }

        // Update hash key. An exploded mover never lands on 'to'.
        if atomic_capture {
            k ^= zobrist::psq(pc, from);
        } else {
            k ^= zobrist::psq(pc, from) ^ zobrist::psq(pc, to);
        }

        // Reset en passant square
        if self.st().ep_square != Square::NONE {
            k ^= zobrist::enpassant(self.st().ep_square.file());
            self.st_mut().ep_square = Square::NONE;
        }

        // Update castling rights if needed
        if self.st().castling_rights != 0
            && self.castling_rights_mask[from.0 as usize]
                | self.castling_rights_mask[to.0 as usize] != 0
        {
            let cr =
                self.castling_rights_mask[from.0 as usize]
                | self.castling_rights_mask[to.0 as usize];
            k ^= zobrist::castling(self.st().castling_rights & cr);
            self.st_mut().castling_rights &= !cr;
        }

        if self.is_three_check() && gives_check {
            self.st_mut().checks_given[us.0 as usize] += 1;
            let n = self.st().checks_given[us.0 as usize];
            debug_assert!(n < 4);
            k ^= zobrist::checks(us, n);
        }

        if atomic_capture {
            // The capturing piece explodes together with its victim
            self.st_mut().blast.push((from, pc));
            self.remove_piece(pc, from);
            let mk = zobrist::material(pc, self.piece_count[pc.0 as usize]);
            self.st_mut().material_key ^= mk;
            if pc.piece_type() != PAWN {
                self.st_mut().non_pawn_material[us.0 as usize] -=
                    piece_value(MG, pc);
            }
        } else if m.move_type() != CASTLING {
            // Move the piece. The tricky Chess960 castling is handled earlier
            self.move_piece(pc, from, to);
        }

        // If the moving piece is a pawn do some special extra work
        if pc.piece_type() == PAWN {
            // Set en-passant square if the moved pawn can be captured.
            // Horde double pushes off the first rank never can.
            if to.0 ^ from.0 == 16
                && !(self.is_horde() && from.relative_rank(us) == RANK_1)
                && !atomic_capture
                && self.attacks_from_pawn(to - pawn_push(us), us)
                    & self.pieces_cp(them, PAWN) != 0
            {
                self.st_mut().ep_square = to - pawn_push(us);
                k ^= zobrist::enpassant(self.st().ep_square.file());
            } else if m.move_type() == PROMOTION && !atomic_capture {
                let promotion = Piece::make(us, m.promotion_type());

                debug_assert!(to.relative_rank(us) == RANK_8);
                debug_assert!(
                    promotion.piece_type() >= KNIGHT
                    && promotion.piece_type() <= QUEEN
                );

                self.remove_piece(pc, to);
                self.put_piece(promotion, to);

                // Update hash keys
                k ^= zobrist::psq(pc, to) ^ zobrist::psq(promotion, to);
                self.st_mut().pawn_key ^= zobrist::psq(pc, to);
                let mk = zobrist::material(promotion,
                        self.piece_count[promotion.0 as usize] - 1)
                    ^ zobrist::material(pc,
                        self.piece_count[pc.0 as usize]);
                self.st_mut().material_key ^= mk;

                // Update incremental score
                self.st_mut().psq +=
                    psqt::psq(promotion, to) - psqt::psq(pc, to);

                // Update material
                self.st_mut().non_pawn_material[us.0 as usize] +=
                    piece_value(MG, promotion);
            }

            // Update pawn hash key
            if atomic_capture {
                self.st_mut().pawn_key ^= zobrist::psq(pc, from);
            } else {
                self.st_mut().pawn_key ^=
                    zobrist::psq(pc, from) ^ zobrist::psq(pc, to);
            }

            // Reset rule 50 draw counter
            self.st_mut().rule50 = 0;
        }

        // Update incremental scores
        if atomic_capture {
            self.st_mut().psq -= psqt::psq(pc, from);
        } else {
            self.st_mut().psq += psqt::psq(pc, to) - psqt::psq(pc, from);
        }

        // Set captured piece
        self.st_mut().captured_piece = captured;

        // Update the key with the final value
        self.st_mut().key = k;

        // Calculate checkers bitboard (if move gives check)
        let gives_check =
            gives_check && !(atomic_capture && self.is_atomic_win());

        self.st_mut().checkers_bb =
            if self.is_race() {
                RANK8_BB & self.square(us, KING)
            } else if self.is_anti() {
                Bitboard(0)
            } else if gives_check {
                self.attackers_to(self.square(them, KING)) & self.pieces_c(us)
            } else {
                Bitboard(0)
            };

        self.side_to_move = them;

        // Update king attacks used for fast check detection
        self.set_check_info();

        debug_assert!(self.pos_is_ok());
    }

    // undo_move() unmakes a move. When it returns, the position should be
    // restored to exactly the same state as before the move was made.

    pub fn undo_move(&mut self, m: Move) {
        debug_assert!(m.is_ok());

        self.side_to_move = !self.side_to_move;

        let us = self.side_to_move;
        let from = m.from();
        let mut to = m.to();
        let mut pc = self.piece_on(to);
        let captured = self.st().captured_piece;
        let atomic_capture = self.is_atomic() && captured != NO_PIECE;

        debug_assert!(self.empty(from) || m.move_type() == CASTLING);
        debug_assert!(self.is_anti() || captured.piece_type() != KING);

        if m.move_type() == PROMOTION && !atomic_capture {
            debug_assert!(to.relative_rank(us) == RANK_8);
            debug_assert!(pc.piece_type() == m.promotion_type());
            debug_assert!(
                pc.piece_type() >= KNIGHT && pc.piece_type() <= QUEEN
            );

            self.remove_piece(pc, to);
            pc = Piece::make(us, PAWN);
            self.put_piece(pc, to);
        }

        if m.move_type() == CASTLING {
            let mut rfrom = Square(0);
            let mut rto = Square(0);
            self.do_castling::<False>(us, from, &mut to, &mut rfrom, &mut rto);
        } else if atomic_capture {
            // Resurrect everything the explosion removed, the mover included
            let blast = self.st().blast.clone();
            for &(bsq, bpc) in blast.iter().rev() {
                self.put_piece(bpc, bsq);
            }
            let capsq = if m.move_type() == ENPASSANT {
                to - pawn_push(us)
            } else {
                to
            };
            self.put_piece(captured, capsq);
        } else {
            // Put the piece back at the source square
            self.move_piece(pc, to, from);

            if captured != NO_PIECE {
                let mut capsq = to;

                if m.move_type() == ENPASSANT {
                    capsq -= pawn_push(us);

                    debug_assert!(pc.piece_type() == PAWN);
                    debug_assert!(to.relative_rank(us) == RANK_6);
                    debug_assert!(self.piece_on(capsq) == NO_PIECE);
                    debug_assert!(captured == Piece::make(!us, PAWN));
                }

                // Restore the captured piece
                self.put_piece(captured, capsq);
            }
        }

        let new_len = self.states.len() - 1;
        self.states.truncate(new_len);
        self.game_ply -= 1;

        debug_assert!(self.pos_is_ok());
    }

    // do_castling() is a helper used to do/undo a castling move. This is
    // a bit tricky in Chess960 where from/to squares can overlap.
    fn do_castling<Do: Bool>(
        &mut self, us: Color, from: Square, to: &mut Square,
        rfrom: &mut Square, rto: &mut Square,
    ) {
        let do_castle = Do::BOOL;
        let king_side = *to > from;
        *rfrom = *to; // Castling is encoded as king captures rook
        *rto = relative_square(us,
            if king_side { Square::F1 } else { Square::D1 });
        *to = relative_square(us,
            if king_side { Square::G1 } else { Square::C1 });

        // Remove both pieces first since squares could overlap in Chess960
        self.remove_piece(Piece::make(us, KING),
            if do_castle { from } else { *to });
        self.remove_piece(Piece::make(us, ROOK),
            if do_castle { *rfrom } else { *rto });
        self.board[(if do_castle { from } else { *to }).0 as usize] = NO_PIECE;
        self.board[(if do_castle { *rfrom } else { *rto }).0 as usize] =
            NO_PIECE;
        self.put_piece(Piece::make(us, KING),
            if do_castle { *to } else { from });
        self.put_piece(Piece::make(us, ROOK),
            if do_castle { *rto } else { *rfrom });
    }

    // do(undo)_null_move() is used to do(undo) a "null move": it flips the
    // side to move without executing any move on the board.

    pub fn do_null_move(&mut self) {
        debug_assert!(self.checkers() == 0);

        let st_copy = (*self.st()).clone(); // full copy
        self.states.push(st_copy);

        if self.st().ep_square != Square::NONE {
            let k = zobrist::enpassant(self.st().ep_square.file());
            self.st_mut().key ^= k;
            self.st_mut().ep_square = Square::NONE;
        }

        self.st_mut().key ^= zobrist::side();

        self.st_mut().rule50 += 1;
        self.st_mut().plies_from_null = 0;

        self.side_to_move = !self.side_to_move;

        self.set_check_info();

        debug_assert!(self.pos_is_ok());
    }

    pub fn undo_null_move(&mut self) {
        debug_assert!(self.checkers() == 0);

        let new_len = self.states.len() - 1;
        self.states.truncate(new_len);
        self.side_to_move = !self.side_to_move;
    }

    // key_after() computes the new hash key after the given move. Needed
    // for speculative prefetch. It does not recognize special moves like
    // castling, en-passant and promotions.

    pub fn key_after(&self, m: Move) -> Key {
        let from = m.from();
        let to = m.to();
        let pc = self.piece_on(from);
        let captured = self.piece_on(to);
        let mut k = self.st().key ^ zobrist::side();

        if captured != NO_PIECE {
            k ^= zobrist::psq(captured, to);
        }

        k ^ zobrist::psq(pc, to) ^ zobrist::psq(pc, from)
    }

    // see() is a static exchange evaluator: it estimates the material gain
    // or loss resulting from a move by simulating a sequence of least-
    // valuable recaptures on the destination square, rescanning for X-ray
    // attackers after every removal.

    pub fn see_sign(&self, m: Move) -> Value {
        debug_assert!(m.is_ok());

        // A third check ends the game on the spot
        if self.is_three_check() && self.gives_check(m) {
            return Value::KNOWN_WIN;
        }

        // Early return if SEE cannot be negative because captured piece
        // value is not less than capturing one. Note that king moves always
        // return here because king midgame value is set to zero.
        if piece_value(MG, self.moved_piece(m))
            <= piece_value(MG, self.piece_on(m.to()))
        {
            return Value::KNOWN_WIN;
        }

        self.see(m)
    }

    pub fn see(&self, m: Move) -> Value {
        debug_assert!(m.is_ok());

        let from = m.from();
        let to = m.to();

        let mut swap_list = [Value::ZERO; 64];
        swap_list[0] = piece_value(MG, self.piece_on(to));
        let mut stm = self.piece_on(from).color();
        let mut occupied = self.pieces() ^ from;

        // Atomic captures never chain: score the explosion directly
        if self.is_atomic() {
            if !self.capture(m) {
                return Value::ZERO;
            }
            let mut blast_eval = Value::ZERO;
            let blast = pseudo_attacks(KING, to)
                & (self.pieces() ^ self.pieces_p(PAWN)) & !from.bb();
            if blast & self.pieces_cp(!stm, KING) != 0 {
                return Value::MATE;
            }
            for c in WHITE.take(2) {
                for pt in 2..6 {
                    let v = popcount(blast & self.pieces_cp(c, PieceType(pt)))
                        as i32 * piece_type_value(MG, PieceType(pt));
                    if c == stm {
                        blast_eval -= v;
                    } else {
                        blast_eval += v;
                    }
                }
            }
            return blast_eval + piece_value(MG, self.piece_on(to))
                - piece_value(MG, self.moved_piece(m));
        }

        // Castling moves are implemented as king capturing the rook so
        // cannot be handled correctly. Simply return zero that is always
        // correct unless in the rare case the rook ends up under attack.
        if m.move_type() == CASTLING {
            return Value::ZERO;
        }

        if m.move_type() == ENPASSANT {
            occupied ^= to - pawn_push(stm); // Remove the captured pawn
            swap_list[0] = PawnValueMg;
        }

        // Find all attackers to the destination square, with the moving
        // piece removed, but possibly an X-ray attacker added behind it.
        let mut attackers = self.attackers_to_occ(to, occupied) & occupied;

        // If the opponent has no attackers we are finished
        stm = !stm;
        let mut stm_attackers = attackers & self.pieces_c(stm);
        if stm_attackers == 0 {
            return swap_list[0];
        }

        // The destination square is defended, which makes things rather
        // more difficult to compute. We proceed by building up a "swap list"
        // containing the material gain or loss at each stop in a sequence of
        // captures to the destination square, where the sides alternately
        // capture, and always capture with the least valuable piece. After
        // each capture, we look for new X-ray attacks from behind the
        // capturing piece.
        let mut captured = self.piece_on(from).piece_type();
        let mut sl_index = 1;

        loop {
            debug_assert!(sl_index < 64);

            // Add the new entry to the swap list
            swap_list[sl_index] =
                -swap_list[sl_index - 1] + piece_type_value(MG, captured);

            // Locate and remove the next least valuable attacker
            captured = self.min_attacker(to, stm_attackers, &mut occupied,
                &mut attackers);
            stm = !stm;
            stm_attackers = attackers & self.pieces_c(stm);
            sl_index += 1;

            if stm_attackers == 0 {
                break;
            }
            if captured == KING {
                // Stop before a king capture that would be recaptured
                sl_index -= 1;
                break;
            }
        }

        // Having built the swap list, we negamax through it to find the
        // best achievable score from the point of view of the side to move.
        while sl_index > 1 {
            sl_index -= 1;
            swap_list[sl_index - 1] =
                std::cmp::min(-swap_list[sl_index], swap_list[sl_index - 1]);
        }

        swap_list[0]
    }

    // min_attacker() locates the least valuable attacker for the side to
    // move, removes it from the occupancy and scans for new X-ray attacks
    // behind it.

    fn min_attacker(
        &self, to: Square, stm_attackers: Bitboard,
        occupied: &mut Bitboard, attackers: &mut Bitboard,
    ) -> PieceType {
        for pt in 1..6 {
            let b = stm_attackers & self.pieces_p(PieceType(pt));
            if b != 0 {
                occupied.0 ^= b.0 & b.0.wrapping_neg();

                if pt == PAWN.0 || pt == BISHOP.0 || pt == QUEEN.0 {
                    *attackers |= attacks_bb(BISHOP, to, *occupied)
                        & self.pieces_pp(BISHOP, QUEEN);
                }
                if pt == ROOK.0 || pt == QUEEN.0 {
                    *attackers |= attacks_bb(ROOK, to, *occupied)
                        & self.pieces_pp(ROOK, QUEEN);
                }

                // After X-ray that may add already processed pieces
                *attackers &= *occupied;
                return PieceType(pt);
            }
        }
        KING // No need to update bitboards: it is the last cycle
    }

    // is_draw() tests whether the position is drawn by 50-move rule or by
    // repetition. It does not detect stalemates. 'ply' is the distance from
    // the search root: a repetition inside the search subtree counts
    // immediately, one reaching back into the game takes two.

    pub fn is_draw(&self, ply: i32) -> bool {
        if self.st().rule50 > 99
            && (self.checkers() == 0
                || MoveList::new(self, GenType::Legal).size() != 0)
        {
            return true;
        }

        let end = std::cmp::min(self.st().rule50, self.st().plies_from_null);

        if end < 4 {
            return false;
        }

        let mut k = self.states.len() - 3;
        let mut cnt = 0;

        let mut i = 4;
        while i <= end {
            k -= 2;

            // Return a draw score if a position repeats once earlier but
            // strictly after the root, or repeats twice before or at the
            // root.
            if self.states[k].key == self.st().key {
                cnt += 1;
                if cnt + ((ply > i) as i32) == 2 {
                    return true;
                }
            }

            i += 2;
        }

        false
    }

    // flip() mirrors the position with the white and black sides reversed.
    // This is only useful for debugging, e.g. for finding evaluation
    // symmetry bugs.

    pub fn flip(&mut self) {
        let fen = self.fen();
        let fields: Vec<&str> = fen.split(' ').collect();

        let swap = |s: &str| -> String {
            s.chars()
                .map(|c| if c.is_lowercase() {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                })
                .collect()
        };

        let placement: Vec<String> =
            fields[0].split('/').rev().map(|r| swap(r)).collect();
        let mut f = placement.join("/");

        f.push_str(if fields[1] == "w" { " b " } else { " w " });
        f.push_str(&swap(fields[2]));
        f.push(' ');

        if fields[3] == "-" {
            f.push('-');
        } else {
            f.push_str(&fields[3][0..1]);
            f.push(if &fields[3][1..2] == "3" { '6' } else { '3' });
        }

        f.push(' ');
        f.push_str(fields[4]);
        f.push(' ');
        f.push_str(fields[5]);

        if self.is_three_check() {
            let w = self.checks_given(WHITE);
            let b = self.checks_given(BLACK);
            f.push_str(&format!(" +{}+{}", b, w));
        }

        let v = self.variant;
        self.set(&f, v).unwrap();

        debug_assert!(self.pos_is_ok());
    }

    fn put_piece(&mut self, pc: Piece, s: Square) {
        self.board[s.0 as usize] = pc;
        self.by_type_bb[ALL_PIECES.0 as usize] |= s;
        self.by_type_bb[pc.piece_type().0 as usize] |= s;
        self.by_color_bb[pc.color().0 as usize] |= s;
        self.index[s.0 as usize] = self.piece_count[pc.0 as usize];
        self.piece_count[pc.0 as usize] += 1;
        self.piece_list[pc.0 as usize][self.index[s.0 as usize] as usize] = s;
        self.piece_count[Piece::make(pc.color(), ALL_PIECES).0 as usize] += 1;
    }

    fn remove_piece(&mut self, pc: Piece, s: Square) {
        self.by_type_bb[ALL_PIECES.0 as usize] ^= s;
        self.by_type_bb[pc.piece_type().0 as usize] ^= s;
        self.by_color_bb[pc.color().0 as usize] ^= s;
        self.piece_count[pc.0 as usize] -= 1;
        let last_square = self.piece_list[pc.0 as usize]
            [self.piece_count[pc.0 as usize] as usize];
        self.index[last_square.0 as usize] = self.index[s.0 as usize];
        self.piece_list[pc.0 as usize]
            [self.index[last_square.0 as usize] as usize] = last_square;
        self.piece_list[pc.0 as usize]
            [self.piece_count[pc.0 as usize] as usize] = Square::NONE;
        self.piece_count[Piece::make(pc.color(), ALL_PIECES).0 as usize] -= 1;
    }

    fn move_piece(&mut self, pc: Piece, from: Square, to: Square) {
        let from_to_bb = from.bb() ^ to.bb();
        self.by_type_bb[ALL_PIECES.0 as usize] ^= from_to_bb;
        self.by_type_bb[pc.piece_type().0 as usize] ^= from_to_bb;
        self.by_color_bb[pc.color().0 as usize] ^= from_to_bb;
        self.board[from.0 as usize] = NO_PIECE;
        self.board[to.0 as usize] = pc;
        self.index[to.0 as usize] = self.index[from.0 as usize];
        self.piece_list[pc.0 as usize][self.index[to.0 as usize] as usize] =
            to;
    }

    // pos_is_ok() performs consistency checks for the position object. The
    // structural checks are cheap and always run; the full pass, including
    // re-deriving the incremental state from scratch, only runs in debug
    // builds.

    pub fn pos_is_ok(&self) -> bool {
        if self.side_to_move != WHITE && self.side_to_move != BLACK {
            return false;
        }

        let wk = self.count(WHITE, KING);
        let bk = self.count(BLACK, KING);
        let kings_ok = if self.is_anti() {
            true
        } else if self.is_horde() {
            wk == 0 && bk == 1
        } else if self.is_atomic() {
            wk + bk >= 1 && wk <= 1 && bk <= 1
        } else {
            wk == 1 && bk == 1
        };
        if !kings_ok {
            return false;
        }

        if self.ep_square() != Square::NONE {
            let r = self.ep_square().relative_rank(self.side_to_move);
            if r != RANK_6 && !(self.is_horde() && r == RANK_7) {
                return false;
            }
        }

        if self.is_horde() {
            if self.pieces_p(PAWN) & RANK8_BB != 0 {
                return false;
            }
        } else if self.pieces_p(PAWN) & (RANK1_BB | RANK8_BB) != 0 {
            return false;
        }

        // The side not to move must not be left in check
        if !self.is_anti() && !self.is_atomic() && !self.is_race() {
            let them_ksq = self.square(!self.side_to_move, KING);
            if them_ksq != Square::NONE
                && self.attackers_to(them_ksq)
                    & self.pieces_c(self.side_to_move) != 0
            {
                return false;
            }
        }

        if cfg!(debug_assertions) {
            if self.pieces_c(WHITE) & self.pieces_c(BLACK) != 0
                || (self.pieces_c(WHITE) | self.pieces_c(BLACK))
                    != self.pieces()
            {
                return false;
            }

            for p1 in 1..7 {
                for p2 in 1..7 {
                    if p1 != p2
                        && self.pieces_p(PieceType(p1))
                            & self.pieces_p(PieceType(p2)) != 0
                    {
                        return false;
                    }
                }
            }

            for p in 1..15 {
                if p == 7 || p == 8 {
                    continue;
                }
                let pc = Piece(p);
                if self.piece_count[pc.0 as usize] != popcount(
                    self.pieces_cp(pc.color(), pc.piece_type())) as i32
                {
                    return false;
                }

                for i in 0..self.piece_count[pc.0 as usize] {
                    let s = self.piece_list[pc.0 as usize][i as usize];
                    if self.board[s.0 as usize] != pc
                        || self.index[s.0 as usize] != i
                    {
                        return false;
                    }
                }
            }

            for c in WHITE.take(2) {
                for cs in &[CastlingSide::KING, CastlingSide::QUEEN] {
                    let cr = CastlingRight::make(c, *cs);
                    if !self.has_castling_right(cr) {
                        continue;
                    }
                    let rsq = self.castling_rook_square(cr);
                    if self.piece_on(rsq) != Piece::make(c, ROOK)
                        || self.castling_rights_mask[rsq.0 as usize] & cr
                            == 0
                        || self.castling_rights_mask
                            [self.square(c, KING).0 as usize] & cr == 0
                    {
                        return false;
                    }
                }
            }

            if !self.state_matches_scratch() {
                return false;
            }
        }

        true
    }

    // state_matches_scratch() re-derives the incrementally maintained hash
    // keys, material and score from the board and compares them against the
    // current state, catching incremental-update drift.

    fn state_matches_scratch(&self) -> bool {
        let vkey = Key(self.variant.0 as u64);
        let mut key = vkey;
        let mut pawn_key = zobrist::no_pawns() ^ vkey;
        let mut material_key = vkey;
        let mut npm = [Value::ZERO; 2];
        let mut psq = Score::ZERO;

        for s in self.pieces() {
            let pc = self.piece_on(s);
            key ^= zobrist::psq(pc, s);
            psq += psqt::psq(pc, s);
            if pc.piece_type() == PAWN {
                pawn_key ^= zobrist::psq(pc, s);
            }
        }

        if self.st().ep_square != Square::NONE {
            key ^= zobrist::enpassant(self.st().ep_square.file());
        }
        if self.side_to_move == BLACK {
            key ^= zobrist::side();
        }
        key ^= zobrist::castling(self.st().castling_rights);
        if self.is_three_check() {
            for c in WHITE.take(2) {
                for n in 1..=self.st().checks_given[c.0 as usize] {
                    key ^= zobrist::checks(c, n);
                }
            }
        }

        for c in WHITE.take(2) {
            for pt in 2..6 {
                let pc = Piece::make(c, PieceType(pt));
                npm[c.0 as usize] +=
                    self.count(c, PieceType(pt)) * piece_value(MG, pc);
            }
            for pt in 1..7 {
                let pc = Piece::make(c, PieceType(pt));
                for cnt in 0..self.count(c, PieceType(pt)) {
                    material_key ^= zobrist::material(pc, cnt);
                }
            }
        }

        key == self.st().key
            && pawn_key == self.st().pawn_key
            && material_key == self.st().material_key
            && npm == self.st().non_pawn_material
            && psq == self.st().psq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_phase_tracks_material() {
        let pos = Position::from_fen(START_FEN, CHESS_VARIANT).unwrap();
        assert_eq!(pos.game_phase(), PHASE_MIDGAME);

        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1",
            CHESS_VARIANT).unwrap();
        assert_eq!(pos.game_phase(), PHASE_ENDGAME);
    }

    #[test]
    fn accessors_reflect_the_start_position() {
        let pos = Position::from_fen(START_FEN, CHESS_VARIANT).unwrap();
        assert_eq!(pos.side_to_move(), WHITE);
        assert_eq!(pos.game_ply(), 0);
        assert_eq!(pos.rule50_count(), 0);
        assert_eq!(pos.count(WHITE, PAWN), 8);
        assert_eq!(pos.square(WHITE, KING), Square::E1);
        assert!(pos.has_castling_right(ANY_CASTLING));
        assert_eq!(pos.checkers(), Bitboard(0));
        assert!(pos.pos_is_ok());
    }
}
