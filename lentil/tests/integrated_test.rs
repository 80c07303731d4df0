use approx::assert_abs_diff_eq;
use lentil::annotate::{annotate_integrated, annotate_single, AnnotateArgs};
use lentil::classify::{classify, classify_by_name, ClassifyArgs};
use lentil::integrated_build::IntegratedBuilder;
use lentil::integrated_classify::classify_integrated;
use lentil::marker_selection::{classic_markers, NamedReference};
use lentil::reference::{BuildArgs, ReferenceBuilder};
use lentil::LabelError;
use nalgebra::DMatrix;

fn names(xs: &[&str]) -> Vec<Box<str>> {
    xs.iter().map(|&x| Box::from(x)).collect()
}

/// T cells high on CD3E, B cells on MS4A1, NK cells on NKG7
fn blood() -> (DMatrix<f32>, Vec<Box<str>>, Vec<Box<str>>) {
    #[rustfmt::skip]
    let xx = DMatrix::<f32>::from_row_slice(5, 6, &[
        9.0, 8.0, 1.0, 2.0, 1.0, 2.0,
        1.0, 2.0, 9.0, 8.0, 2.0, 1.0,
        2.0, 1.0, 2.0, 1.0, 9.0, 8.0,
        5.0, 4.0, 4.0, 5.0, 5.0, 4.0,
        4.0, 5.0, 5.0, 4.0, 4.0, 5.0,
    ]);
    let features = names(&["CD3E", "MS4A1", "NKG7", "ACTB", "GAPDH"]);
    let labels = names(&["T", "T", "B", "B", "NK", "NK"]);
    (xx, features, labels)
}

/// The query lists its features in another order, with an extra one
fn query() -> (DMatrix<f32>, Vec<Box<str>>) {
    #[rustfmt::skip]
    let xx = DMatrix::<f32>::from_row_slice(6, 3, &[
        4.5, 4.0, 5.0,
        1.5, 1.0, 8.0,
        8.5, 2.0, 1.0,
        0.0, 3.0, 3.0,
        1.5, 9.0, 2.0,
        4.5, 5.0, 4.0,
    ]);
    let features = names(&["ACTB", "MS4A1", "CD3E", "XIST", "NKG7", "GAPDH"]);
    (xx, features)
}

#[test]
fn single_reference_integration_agrees() -> anyhow::Result<()> {
    let (xx, features, labels) = blood();
    let ids: Vec<usize> = labels
        .iter()
        .map(|x| match x.as_ref() {
            "T" => 0,
            "B" => 1,
            _ => 2,
        })
        .collect();
    let (qq, query_features) = query();

    let markers = classic_markers(&xx, &ids, 3, None, 1)?;
    let model = ReferenceBuilder::new(BuildArgs {
        approximate: false,
        ..Default::default()
    })
    .build(&xx, &ids, &markers)?;

    let single = classify_by_name(&qq, &query_features, &model, &features, &ClassifyArgs::default())?;
    assert_eq!(single.best, vec![0, 2, 1]);

    let mut builder = IntegratedBuilder::new(&query_features);
    builder.add(model.clone(), &features)?;
    let integrated = builder.finish()?;
    assert_eq!(integrated.num_references(), 1);
    assert!(integrated.diagnostics().is_empty());
    assert_eq!(integrated.references()[0].num_shared_features(), 3);

    let out = classify_integrated(&qq, &[&single.best], &integrated, 0.8, 2)?;
    assert_eq!(out.best_reference, vec![0, 0, 0]);
    assert_eq!(out.best_label, single.best);
    assert!(out.delta.iter().all(|&d| d == 0.0));
    // same label, same markers: the same score as the first round
    for j in 0..3 {
        assert_abs_diff_eq!(
            out.scores[(j, 0)],
            single.scores[(j, single.best[j])],
            epsilon = 1e-5
        );
    }
    Ok(())
}

#[test]
fn disjoint_reference_is_set_aside() -> anyhow::Result<()> {
    let (xx, features, _) = blood();
    let ids: Vec<usize> = (0..6).map(|j| j / 2).collect();
    let (qq, query_features) = query();

    let markers = classic_markers(&xx, &ids, 3, None, 1)?;
    let model = ReferenceBuilder::new(BuildArgs::default()).build(&xx, &ids, &markers)?;
    let single = classify_by_name(&qq, &query_features, &model, &features, &ClassifyArgs::default())?;

    let mouse = names(&["Cd3e", "Ms4a1", "Nkg7", "Actb", "Gapdh"]);
    assert!(matches!(
        classify_by_name(&qq, &query_features, &model, &mouse, &ClassifyArgs::default()),
        Err(LabelError::MissingFeature(_))
    ));

    let mut builder = IntegratedBuilder::new(&query_features);
    builder.add(model.clone(), &mouse)?;
    builder.add(model.clone(), &features)?;
    assert!(matches!(
        builder.add(model.clone(), &features[..2]),
        Err(LabelError::DimensionMismatch(_))
    ));
    let integrated = builder.finish()?;

    assert_eq!(integrated.num_inputs(), 2);
    assert_eq!(integrated.num_references(), 1);
    assert_eq!(integrated.source_index(0), Some(1));
    assert!(matches!(
        integrated.diagnostics(),
        [LabelError::FeatureUniverseMismatch { reference: 0 }]
    ));

    // the slice for the dropped reference is ignored
    let out = classify_integrated(&qq, &[&[], &single.best], &integrated, 0.8, 1)?;
    assert_eq!(out.best_label, single.best);

    assert!(matches!(
        classify_integrated(&qq, &[&[], &[0, 1]], &integrated, 0.8, 1),
        Err(LabelError::DimensionMismatch(_))
    ));
    assert!(matches!(
        classify_integrated(&qq, &[&[], &[0, 1, 5]], &integrated, 0.8, 1),
        Err(LabelError::InvalidLabel { label: 5, nlabels: 3 })
    ));

    let mut nothing = IntegratedBuilder::new(&query_features);
    nothing.add(model, &mouse)?;
    assert!(matches!(
        nothing.finish(),
        Err(LabelError::FeatureUniverseMismatch { .. })
    ));
    Ok(())
}

#[test]
fn better_reference_wins() -> anyhow::Result<()> {
    let (xx, features, labels) = blood();
    let (qq, query_features) = query();

    // a coarse reference that only knows T against the rest
    #[rustfmt::skip]
    let coarse = DMatrix::<f32>::from_row_slice(3, 4, &[
        9.0, 8.0, 1.0, 2.0,
        1.0, 2.0, 5.0, 6.0,
        2.0, 1.0, 6.0, 5.0,
    ]);
    let coarse_features = names(&["CD3E", "MS4A1", "NKG7"]);
    let coarse_labels = names(&["T", "T", "other", "other"]);

    let references = [
        NamedReference {
            mat: &xx,
            features: &features,
            labels: &labels,
        },
        NamedReference {
            mat: &coarse,
            features: &coarse_features,
            labels: &coarse_labels,
        },
    ];

    let args = AnnotateArgs::default();
    let fine = annotate_single(&qq, &query_features, &references[0], &args)?;
    assert_eq!(fine.best_names(), names(&["T", "NK", "B"]));
    assert_eq!(fine.markers["B"]["T"], names(&["CD3E"]));

    let out = annotate_integrated(&qq, &query_features, &references, &args)?;
    assert_eq!(out.per_reference.len(), 2);
    assert_eq!(out.model.num_references(), 2);
    assert_eq!(out.result.scores.dim(), (3, 2));
    // the T column is claimed by both, the others by the finer reference
    assert_eq!(&*out.best_names()[0], "T");
    assert_eq!(&out.best_names()[1..], &names(&["NK", "B"])[..]);
    assert_eq!(&out.best_sources()[1..], &[0, 0]);
    Ok(())
}

#[test]
fn annotation_drops_unusable_features() -> anyhow::Result<()> {
    let (mut xx, features, labels) = blood();
    let (qq, query_features) = query();
    xx[(1, 3)] = f32::NAN;

    let reference = NamedReference {
        mat: &xx,
        features: &features,
        labels: &labels,
    };
    let out = annotate_single(&qq, &query_features, &reference, &AnnotateArgs::default())?;
    assert!(!out.features.iter().any(|x| &**x == "MS4A1"));
    assert_eq!(out.features.len(), 4);
    assert_eq!(out.result.num_columns(), 3);

    let unrelated = names(&["a", "b", "c", "d", "e"]);
    let other = NamedReference {
        mat: &xx,
        features: &unrelated,
        labels: &labels,
    };
    assert!(matches!(
        annotate_single(&qq, &query_features, &other, &AnnotateArgs::default()),
        Err(LabelError::FeatureUniverseMismatch { .. })
    ));

    let both = annotate_integrated(
        &qq,
        &query_features,
        &[reference, other],
        &AnnotateArgs::default(),
    )?;
    assert!(both.per_reference[1].is_none());
    assert_eq!(both.model.num_references(), 1);
    assert_eq!(both.best_sources(), vec![0, 0, 0]);
    Ok(())
}

#[test]
fn exact_rows_match_classify_by_name() -> anyhow::Result<()> {
    let (xx, features, _) = blood();
    let ids = vec![0, 0, 1, 1, 2, 2];
    let (qq, query_features) = query();

    let markers = classic_markers(&xx, &ids, 3, None, 1)?;
    let model = ReferenceBuilder::new(BuildArgs::default()).build(&xx, &ids, &markers)?;

    // CD3E, MS4A1, NKG7 sit at query rows 2, 1, 4
    let by_rows = classify(&qq, &[2, 1, 4], &model, &ClassifyArgs::default())?;
    let by_name = classify_by_name(&qq, &query_features, &model, &features, &ClassifyArgs::default())?;
    assert_eq!(by_rows.best, by_name.best);
    assert_eq!(by_rows.scores, by_name.scores);
    Ok(())
}
