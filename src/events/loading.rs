use bevy_ecs::message::Message;

/// Progress notifications sent *from* the sprite loader.
///
/// Subscribers get them through
/// [`SpriteLoader::subscribe`](crate::resources::spriteloader::SpriteLoader::subscribe);
/// inside the ECS they are forwarded into `Messages<LoadMessage>` by
/// [`poll_load_messages`](crate::systems::loading::poll_load_messages).
#[derive(Message, Debug, Clone, PartialEq)]
pub enum LoadMessage {
    Started { total: usize },
    SheetLoaded { id: String, frames: usize, progress: u8 },
    Finished { sheets: usize },
    Failed { id: String, error: String },
}
