//! Presentation side of the session
//!
//! The session core never owns visual objects. It asks a [`Presenter`] to
//! spawn, move, animate and destroy a representation per peer and keeps only
//! the opaque handle the presenter gives back. Any engine can sit behind the
//! trait; [`ConsolePresenter`] is a headless one that tracks representations
//! in memory and reports through the log.

use log::info;
use shared::{Peer, PeerId, Position};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Capabilities the session core needs from the presentation layer
pub trait Presenter {
    type Handle;

    fn spawn_peer(&mut self, peer: &Peer) -> Self::Handle;

    fn destroy_peer(&mut self, handle: Self::Handle);

    fn set_position(&mut self, handle: &Self::Handle, position: Position);

    fn play_shot_effect(&mut self, handle: &Self::Handle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpriteHandle(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub peer_id: PeerId,
    pub position: Position,
    pub shots: u32,
}

/// In-memory presenter used by the terminal client
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    next_handle: u64,
    sprites: BTreeMap<SpriteHandle, Sprite>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sprite(&self, handle: &SpriteHandle) -> Option<&Sprite> {
        self.sprites.get(handle)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// One line per live representation, ordered by spawn time
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:>8}  {:>9} {:>9} {:>9}  {:>5}", "peer", "x", "y", "z", "shots");
        for sprite in self.sprites.values() {
            let _ = writeln!(
                out,
                "{:>8}  {:>9.2} {:>9.2} {:>9.2}  {:>5}",
                sprite.peer_id,
                sprite.position.x,
                sprite.position.y,
                sprite.position.z,
                sprite.shots
            );
        }
        out
    }
}

impl Presenter for ConsolePresenter {
    type Handle = SpriteHandle;

    fn spawn_peer(&mut self, peer: &Peer) -> SpriteHandle {
        let handle = SpriteHandle(self.next_handle);
        self.next_handle += 1;

        info!(
            "Spawned player {} at ({:.2}, {:.2}, {:.2})",
            peer.id, peer.position.x, peer.position.y, peer.position.z
        );
        self.sprites.insert(
            handle,
            Sprite {
                peer_id: peer.id,
                position: peer.position,
                shots: 0,
            },
        );
        handle
    }

    fn destroy_peer(&mut self, handle: SpriteHandle) {
        if let Some(sprite) = self.sprites.remove(&handle) {
            info!("Removed player {}", sprite.peer_id);
        }
    }

    fn set_position(&mut self, handle: &SpriteHandle, position: Position) {
        if let Some(sprite) = self.sprites.get_mut(handle) {
            sprite.position = position;
        }
    }

    fn play_shot_effect(&mut self, handle: &SpriteHandle) {
        if let Some(sprite) = self.sprites.get_mut(handle) {
            sprite.shots += 1;
            info!("Player {} fired", sprite.peer_id);
        }
    }
}
