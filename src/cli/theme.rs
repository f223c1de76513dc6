//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

// ANSI escape codes for REPL output.
//
// Only the 16 palette slots are used, never RGB, so a plan result renders
// in whatever colors the terminal profile assigns to them.

const GRAY: &str = "\x1b[90m";
const CYAN_BOLD: &str = "\x1b[1;36m";
const DEFAULT_FG: &str = "\x1b[39m";

pub const R: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const ITALIC: &str = "\x1b[3m";

// Result grid: box lines, column names and dtypes, cells, row count.
pub const BORDER: &str = GRAY;
pub const HEADER: &str = CYAN_BOLD;
pub const TYPE_DIM: &str = GRAY;
pub const TEXT: &str = DEFAULT_FG;
pub const NULL_CLR: &str = GRAY;
pub const FOOTER: &str = GRAY;

// Plan outcome
pub const ERROR: &str = "\x1b[1;31m";
pub const SUCCESS: &str = "\x1b[32m";
pub const TIMER: &str = GRAY;
pub const PIPELINE: &str = "\x1b[33m";

// Startup box
pub const BAN_BORDER: &str = "\x1b[34m";
pub const BAN_TITLE: &str = CYAN_BOLD;
pub const BAN_INFO: &str = DEFAULT_FG;
pub const BAN_HELP: &str = GRAY;

// .help listing
pub const CMD: &str = "\x1b[36m";
pub const CMD_DESC: &str = GRAY;
