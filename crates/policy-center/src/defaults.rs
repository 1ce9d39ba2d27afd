use crate::model::{
    DenialCopy, FeatureFlags, GateSettings, MetaSettings, NoticeSettings, RedirectSettings,
    RoleSettings,
};

pub fn default_settings() -> GateSettings {
    GateSettings {
        rev: 1,
        meta: MetaSettings {
            prefix: "pcr-rpbr".into(),
        },
        roles: RoleSettings {
            privileged: vec!["administrator".into(), "editor".into()],
            hidden_from_picker: vec![
                "administrator".into(),
                "editor".into(),
                "author".into(),
                "contributor".into(),
                "subscriber".into(),
                "app_subscriber".into(),
                "super_admin".into(),
            ],
        },
        denial: DenialCopy {
            heading: "Restricted Content".into(),
            message: "Apologies, you do not have the proper permissions to access this page."
                .into(),
            back_label: "Back on the home page".into(),
        },
        notice: NoticeSettings {
            query_var: "redirectURL".into(),
            query_value: "ID".into(),
            message: "Not a valid Redirect URL!".into(),
        },
        redirect: RedirectSettings { status: 302 },
        features: FeatureFlags {
            strip_hard_links: true,
            page_list: false,
            recent_items: false,
            search_filter: true,
            restrict_titles: false,
        },
        provenance: Default::default(),
    }
}
