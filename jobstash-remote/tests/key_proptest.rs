use std::sync::Arc;

use proptest::prelude::*;

use jobstash_core::ObjectPath;
use jobstash_remote::{RemoteItemPath, RepoClient, RepoEndpoint};

fn gen_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 +._-]{1,12}"
}

fn node(root: &str, path: &str) -> RemoteItemPath {
    let endpoint = RepoEndpoint::new("http://repo.example.com", "generic-local", None);
    RemoteItemPath::new(Arc::new(RepoClient::connect(endpoint).unwrap()), root, path)
}

proptest! {
    #[test]
    fn child_navigation_never_bends_the_root(
        segments in prop::collection::vec(gen_segment(), 1..6)
    ) {
        let mut current = node("jenkins/my-job", "base");
        for segment in &segments {
            current = current.child(segment);
        }

        prop_assert_eq!(current.root(), "jenkins/my-job");
        prop_assert_eq!(
            current.path(),
            format!("base/{}", segments.join("/"))
        );
    }

    #[test]
    fn full_key_is_root_then_path(
        a in gen_segment(),
        b in gen_segment()
    ) {
        let leaf = node("jenkins/my-job", "base").child(&a).child(&b);
        prop_assert_eq!(leaf.full_key(), format!("jenkins/my-job/base/{}/{}", a, b));
    }
}
