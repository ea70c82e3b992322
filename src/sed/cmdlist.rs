//! Fixed-block command arena.
//!
//! Commands are appended to 256-entry blocks, each boxed so its heap
//! address never moves even as the outer `Vec` of blocks grows. A `CmdId`
//! is a flat index into this arena rather than a pointer, which keeps
//! `Command` plain data and lets the same id cheaply serve both as the
//! "next command to run" successor and as a branch/jump target.

use crate::sed::ast::Command;

pub const BLOCK_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CmdId(pub u32);

/// The non-default control-flow target of a command: either the next
/// command in the arena, or one of the cycle-level sentinels that used to
/// be modeled as special pointer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Cmd(CmdId),
    /// Falls off the end of the script: auto-print (unless `-n`), drain
    /// the append queue, start the next cycle.
    Over,
    /// Restarts the cycle on the current pattern space without reading a
    /// new line (`D` when the pattern space still holds an embedded
    /// newline).
    Again,
    Quit,
    QuitQuiet,
}

struct CommandBlock {
    len: usize,
    buf: Vec<Command>,
}

impl CommandBlock {
    fn new() -> Self {
        Self { len: 0, buf: Vec::with_capacity(BLOCK_SIZE) }
    }
}

pub struct CommandList {
    blocks: Vec<Box<CommandBlock>>,
}

impl CommandList {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn push(&mut self, cmd: Command) -> CmdId {
        if self.blocks.is_empty() || self.blocks.last().unwrap().len >= BLOCK_SIZE {
            self.blocks.push(Box::new(CommandBlock::new()));
        }
        let block_idx = self.blocks.len() - 1;
        let block = self.blocks.last_mut().unwrap();
        let slot = block.len;
        block.buf.push(cmd);
        block.len += 1;
        CmdId((block_idx * BLOCK_SIZE + slot) as u32)
    }

    pub fn get(&self, id: CmdId) -> &Command {
        let idx = id.0 as usize;
        &self.blocks[idx / BLOCK_SIZE].buf[idx % BLOCK_SIZE]
    }

    pub fn get_mut(&mut self, id: CmdId) -> &mut Command {
        let idx = id.0 as usize;
        &mut self.blocks[idx / BLOCK_SIZE].buf[idx % BLOCK_SIZE]
    }

    pub fn len(&self) -> usize {
        self.blocks.iter().map(|b| b.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first_id(&self) -> Option<CmdId> {
        if self.is_empty() { None } else { Some(CmdId(0)) }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CmdId, &Command)> {
        (0..self.len() as u32).map(move |i| (CmdId(i), self.get(CmdId(i))))
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-command execution state, kept in a flat array parallel to the
/// command arena and indexed by `CmdId` rather than embedded in `Command`
/// itself, so a compiled program stays immutable and shareable across
/// several `execute()` calls.
#[derive(Debug, Clone, Default)]
pub struct ExecState {
    pub range_active: bool,
    pub range_start_line: Option<u64>,
    pub range_done: bool,
}

pub fn new_exec_states(list: &CommandList) -> Vec<ExecState> {
    vec![ExecState::default(); list.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sed::ast::CommandKind;

    fn dummy(kind: CommandKind) -> Command {
        Command { addr: None, kind, next: Next::Over, loc: None }
    }

    #[test]
    fn push_spans_multiple_blocks() {
        let mut list = CommandList::new();
        for _ in 0..(BLOCK_SIZE * 2 + 3) {
            list.push(dummy(CommandKind::Print));
        }
        assert_eq!(list.len(), BLOCK_SIZE * 2 + 3);
        let id = CmdId((BLOCK_SIZE * 2 + 2) as u32);
        assert!(matches!(list.get(id).kind, CommandKind::Print));
    }

    #[test]
    fn ids_stay_stable_across_growth() {
        let mut list = CommandList::new();
        let first = list.push(dummy(CommandKind::Delete));
        for _ in 0..BLOCK_SIZE {
            list.push(dummy(CommandKind::Print));
        }
        assert!(matches!(list.get(first).kind, CommandKind::Delete));
    }
}
