//! Fixed table and column allowlist for the `videos` / `video_snapshots` schema.
//!
//! Every identifier that appears in emitted SQL comes from here; request
//! fields only ever reach the database as bound parameters.

/// Source tables together with the alias every query uses for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Videos,
    VideoSnapshots,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Videos => "videos",
            Table::VideoSnapshots => "video_snapshots",
        }
    }

    pub fn alias(&self) -> &'static str {
        match self {
            Table::Videos => "v",
            Table::VideoSnapshots => "s",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    VideoId,
    VideoCreatorId,
    VideoPublishedAt,
    VideoViews,
    VideoLikes,
    SnapshotVideoId,
    SnapshotDeltaViews,
    SnapshotCreatedAt,
}

impl Column {
    pub fn table(&self) -> Table {
        match self {
            Column::VideoId
            | Column::VideoCreatorId
            | Column::VideoPublishedAt
            | Column::VideoViews
            | Column::VideoLikes => Table::Videos,
            Column::SnapshotVideoId | Column::SnapshotDeltaViews | Column::SnapshotCreatedAt => {
                Table::VideoSnapshots
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::VideoId => "id",
            Column::VideoCreatorId => "creator_id",
            Column::VideoPublishedAt => "video_created_at",
            Column::VideoViews => "views_count",
            Column::VideoLikes => "likes_count",
            Column::SnapshotVideoId => "video_id",
            Column::SnapshotDeltaViews => "delta_views_count",
            Column::SnapshotCreatedAt => "created_at",
        }
    }

    /// Alias-qualified reference, e.g. `s.created_at`.
    pub fn qualified(&self) -> &'static str {
        match self {
            Column::VideoId => "v.id",
            Column::VideoCreatorId => "v.creator_id",
            Column::VideoPublishedAt => "v.video_created_at",
            Column::VideoViews => "v.views_count",
            Column::VideoLikes => "v.likes_count",
            Column::SnapshotVideoId => "s.video_id",
            Column::SnapshotDeltaViews => "s.delta_views_count",
            Column::SnapshotCreatedAt => "s.created_at",
        }
    }
}

/// FROM clauses the builder may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Videos,
    Snapshots,
    /// Snapshots joined to their parent video, for creator filtering.
    SnapshotsWithVideos,
}

impl Source {
    pub fn render(&self) -> &'static str {
        match self {
            Source::Videos => "videos AS v",
            Source::Snapshots => "video_snapshots AS s",
            Source::SnapshotsWithVideos => {
                "video_snapshots AS s JOIN videos AS v ON v.id = s.video_id"
            }
        }
    }

    pub fn includes(&self, table: Table) -> bool {
        match self {
            Source::Videos => table == Table::Videos,
            Source::Snapshots => table == Table::VideoSnapshots,
            Source::SnapshotsWithVideos => true,
        }
    }
}
