use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use super::remote::Remote;
use super::types::Container;
use crate::events::{EventSink, SyncEvent};

/// Builds the course → folder → file tree for one run.
///
/// Read-only: the loader never looks at the sync log. Order within each
/// level is whatever Canvas returned.
pub struct HierarchyLoader<'a> {
    remote: &'a Remote<'a>,
    sink: &'a dyn EventSink,
}

impl<'a> HierarchyLoader<'a> {
    pub fn new(remote: &'a Remote<'a>, sink: &'a dyn EventSink) -> Self {
        Self { remote, sink }
    }

    /// Fetch every course whose code is in `allow` (all courses when `allow`
    /// holds nothing but blanks), then its folders, then their files.
    ///
    /// Stops descending once `shutdown` is cancelled; courses already
    /// loaded are returned.
    pub async fn load(
        &self,
        allow: &HashSet<String>,
        shutdown: &CancellationToken,
    ) -> Vec<Container> {
        let allow = normalize_allow_list(allow);
        let mut courses: Vec<Container> = self
            .remote
            .list_containers()
            .await
            .into_iter()
            .filter(|c| allow.is_empty() || allow.contains(c.code.as_str()))
            .collect();

        if !allow.is_empty() {
            tracing::debug!(
                "{} course(s) match the filter {:?}",
                courses.len(),
                allow
            );
        }

        let mut loaded = 0;
        for course in &mut courses {
            if shutdown.is_cancelled() {
                break;
            }
            self.sink.emit(SyncEvent::ContainerStarted {
                code: course.code.clone(),
                name: course.name.clone(),
            });

            let mut folders = self.remote.list_sub_containers(course.id).await;
            for folder in &mut folders {
                if shutdown.is_cancelled() {
                    break;
                }
                self.sink.emit(SyncEvent::SubContainerDiscovered {
                    id: folder.id,
                    path: folder.relative_path(),
                });
                folder.items = self.remote.list_items(folder.id).await;
            }
            course.children = folders;
            loaded += 1;
        }
        courses.truncate(loaded);
        courses
    }
}

/// Trim entries and drop blank ones.
fn normalize_allow_list(allow: &HashSet<String>) -> HashSet<&str> {
    allow
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::testing::FakeCanvas;
    use crate::events::{FetchScope, RecordingSink};

    fn two_courses() -> FakeCanvas {
        let api = FakeCanvas::new();
        api.add_course(1, "Math", "MATH101");
        api.add_course(2, "Physics", "PHYS201");
        api.add_folder(1, 10, "course files");
        api.add_folder(1, 11, "course files/Unit1");
        api.add_folder(2, 20, "course files");
        api.put_file(10, 100, "v1", "a.pdf", b"a");
        api.put_file(11, 101, "v1", "b.pdf", b"b");
        api.put_file(20, 200, "v1", "c.pdf", b"c");
        api
    }

    fn allow(codes: &[&str]) -> HashSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn loads_full_tree_in_api_order() {
        let api = two_courses();
        let sink = RecordingSink::new();
        let remote = Remote::new(&api, &sink);
        let loader = HierarchyLoader::new(&remote, &sink);

        let tree = loader.load(&HashSet::new(), &CancellationToken::new()).await;

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].code, "MATH101");
        let folder_ids: Vec<u64> = tree[0].children.iter().map(|f| f.id).collect();
        assert_eq!(folder_ids, vec![10, 11]);
        assert_eq!(tree[0].children[1].items[0].id, 101);
        assert_eq!(tree[1].children[0].items[0].id, 200);

        assert_eq!(
            sink.take(),
            vec![
                SyncEvent::ContainerStarted {
                    code: "MATH101".into(),
                    name: "Math".into()
                },
                SyncEvent::SubContainerDiscovered {
                    id: 10,
                    path: "/".into()
                },
                SyncEvent::SubContainerDiscovered {
                    id: 11,
                    path: "/Unit1".into()
                },
                SyncEvent::ContainerStarted {
                    code: "PHYS201".into(),
                    name: "Physics".into()
                },
                SyncEvent::SubContainerDiscovered {
                    id: 20,
                    path: "/".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn allow_list_restricts_fetches() {
        let api = two_courses();
        let sink = RecordingSink::new();
        let remote = Remote::new(&api, &sink);
        let loader = HierarchyLoader::new(&remote, &sink);

        let tree = loader
            .load(&allow(&["MATH101"]), &CancellationToken::new())
            .await;

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].code, "MATH101");
        assert_eq!(api.folder_requests(), vec![1]);
    }

    #[tokio::test]
    async fn blank_allow_list_means_everything() {
        let api = two_courses();
        let sink = RecordingSink::new();
        let remote = Remote::new(&api, &sink);
        let loader = HierarchyLoader::new(&remote, &sink);

        let tree = loader
            .load(&allow(&["", "   "]), &CancellationToken::new())
            .await;
        assert_eq!(tree.len(), 2);
    }

    #[tokio::test]
    async fn allow_list_entries_are_trimmed() {
        let api = two_courses();
        let sink = RecordingSink::new();
        let remote = Remote::new(&api, &sink);
        let loader = HierarchyLoader::new(&remote, &sink);

        let tree = loader
            .load(&allow(&[" PHYS201 "]), &CancellationToken::new())
            .await;
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].code, "PHYS201");
    }

    #[tokio::test]
    async fn failed_folder_fetch_isolated_to_its_course() {
        let api = two_courses();
        api.fail_folders(1, 403);
        let sink = RecordingSink::new();
        let remote = Remote::new(&api, &sink);
        let loader = HierarchyLoader::new(&remote, &sink);

        let tree = loader.load(&HashSet::new(), &CancellationToken::new()).await;

        assert!(tree[0].children.is_empty());
        assert_eq!(tree[1].children[0].items.len(), 1);
        assert!(sink.take().contains(&SyncEvent::FetchError {
            scope: FetchScope::SubContainers,
            id: Some(1),
            status: Some(403),
        }));
    }

    #[tokio::test]
    async fn failed_course_list_yields_empty_tree() {
        let api = two_courses();
        api.fail_courses(401);
        let sink = RecordingSink::new();
        let remote = Remote::new(&api, &sink);
        let loader = HierarchyLoader::new(&remote, &sink);

        let tree = loader.load(&HashSet::new(), &CancellationToken::new()).await;

        assert!(tree.is_empty());
        assert_eq!(remote.fetch_errors(), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_loads_nothing() {
        let api = two_courses();
        let sink = RecordingSink::new();
        let remote = Remote::new(&api, &sink);
        let loader = HierarchyLoader::new(&remote, &sink);
        let token = CancellationToken::new();
        token.cancel();

        let tree = loader.load(&HashSet::new(), &token).await;
        assert!(tree.is_empty());
        assert!(api.folder_requests().is_empty());
    }
}
