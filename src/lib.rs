// SPDX-License-Identifier: GPL-3.0-or-later

pub mod bitboard;
pub mod misc;
pub mod movegen;
pub mod position;
pub mod psqt;
pub mod types;

// init() warms up the global attack, Zobrist and piece-square tables. The
// tables also build themselves lazily on first use, so calling this is
// optional; an engine front end typically does it once at startup.
pub fn init() {
    bitboard::init();
    psqt::init();
}
